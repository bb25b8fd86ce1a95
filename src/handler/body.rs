//! Request body aggregation
//!
//! The one place a matched request waits before its handler runs.

use crate::error::BodyReadError;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};

/// Collect every data frame of `body` into one string
///
/// Invalid UTF-8 is replaced rather than rejected. A `limit` of 0 disables
/// the size check.
pub async fn aggregate<B>(body: B, limit: u64) -> Result<String, BodyReadError>
where
    B: Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut buf = Vec::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| BodyReadError::Read(e.to_string()))?;
        // Trailers carry no payload
        if let Ok(data) = frame.into_data() {
            buf.extend_from_slice(&data);
            if limit > 0 && buf.len() as u64 > limit {
                return Err(BodyReadError::TooLarge { limit });
            }
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}
