//! Static asset fallback
//!
//! Serves everything under the reserved static prefix. The request path is
//! resolved against the static root; the extension table only decides whether
//! a request is accepted at all. What is sent back is always a JPEG thumbnail:
//! one per directory entry for a directory, or one of the resolved file.

use super::thumbnail::{self, DIRECTORY_THUMBNAIL_SIZE, FILE_THUMBNAIL_SIZE};
use crate::error::StaticError;
use crate::http::{self, mime, Body};
use crate::logger;
use hyper::Response;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;

/// Static asset resolver bound to one root directory
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
    limiter: Arc<Semaphore>,
}

/// One element of a directory response, shaped like a serialized Node `Buffer`
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename = "Buffer")]
pub struct EncodedThumbnail {
    pub data: Vec<u8>,
}

impl StaticAssets {
    pub fn new(root: impl Into<PathBuf>, thumbnail_concurrency: usize) -> Self {
        Self {
            root: root.into(),
            limiter: Arc::new(Semaphore::new(thumbnail_concurrency.max(1))),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve `url_path`; every failure becomes an error response
    pub async fn serve(&self, url_path: &str) -> Response<Body> {
        match self.render(url_path).await {
            Ok(resp) => resp,
            Err(e) => {
                logger::log_warning(&format!("Static request '{url_path}' failed: {e}"));
                error_response(&e)
            }
        }
    }

    async fn render(&self, url_path: &str) -> Result<Response<Body>, StaticError> {
        let relative = sanitize(url_path)?;
        let extension = relative
            .extension()
            .map(|e| e.to_string_lossy().into_owned());

        let target = match extension.as_deref() {
            Some(ext) => {
                if mime::get_content_type(ext).is_none() {
                    return Err(StaticError::UnsupportedExtension(ext.to_string()));
                }
                self.root.join(&relative)
            }
            None => self.resolve_extensionless(&relative).await,
        };

        let requested = self.root.join(&relative);
        if extension.is_none() && is_dir(&requested).await {
            let json = self.directory_thumbnails(&requested).await?;
            return Ok(http::build_thumbnail_response(json));
        }

        let thumb = thumbnail_at(target, FILE_THUMBNAIL_SIZE, Arc::clone(&self.limiter)).await?;
        Ok(http::build_thumbnail_response(thumb))
    }

    /// `<path>.html` when it exists, otherwise `<path>/index.html`
    async fn resolve_extensionless(&self, relative: &Path) -> PathBuf {
        let mut with_html = relative.as_os_str().to_owned();
        with_html.push(".html");
        let candidate = self.root.join(with_html);
        if fs::try_exists(&candidate).await.unwrap_or(false) {
            candidate
        } else {
            self.root.join(relative).join("index.html")
        }
    }

    /// JSON array with one thumbnail per entry, `null` where one failed
    async fn directory_thumbnails(&self, dir: &Path) -> Result<Vec<u8>, StaticError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir).await.map_err(|source| StaticError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        while let Some(entry) = entries.next_entry().await.map_err(|source| StaticError::Io {
            path: dir.to_path_buf(),
            source,
        })? {
            names.push(entry.file_name());
        }
        names.sort();

        let tasks: Vec<_> = names
            .into_iter()
            .map(|name| {
                let path = dir.join(name);
                tokio::spawn(thumbnail_at(
                    path,
                    DIRECTORY_THUMBNAIL_SIZE,
                    Arc::clone(&self.limiter),
                ))
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            let result = task.await.map_err(StaticError::from).and_then(|r| r);
            match result {
                Ok(data) => results.push(Some(EncodedThumbnail { data })),
                Err(e) => {
                    logger::log_warning(&format!("Skipping thumbnail: {e}"));
                    results.push(None);
                }
            }
        }

        serde_json::to_vec(&results).map_err(|e| StaticError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })
    }
}

/// Read and render one file on the blocking pool
async fn thumbnail_at(
    path: PathBuf,
    size: u32,
    limiter: Arc<Semaphore>,
) -> Result<Vec<u8>, StaticError> {
    let content = fs::read(&path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StaticError::NotFound(path.clone())
        } else {
            StaticError::Io {
                path: path.clone(),
                source,
            }
        }
    })?;

    // Held until rendering finishes; the semaphore is never closed
    let _permit = limiter.acquire_owned().await;
    tokio::task::spawn_blocking(move || {
        thumbnail::render(&content, size).map_err(|source| StaticError::Thumbnail { path, source })
    })
    .await?
}

/// Strip the leading slash and refuse anything that could leave the root
fn sanitize(url_path: &str) -> Result<PathBuf, StaticError> {
    let relative = Path::new(url_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        logger::log_warning(&format!("Path traversal attempt blocked: {url_path}"));
        return Err(StaticError::NotFound(relative.to_path_buf()));
    }
    Ok(relative.to_path_buf())
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

fn error_response(err: &StaticError) -> Response<Body> {
    match err {
        StaticError::UnsupportedExtension(_) | StaticError::NotFound(_) => {
            http::build_static_404_response()
        }
        StaticError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            http::build_static_404_response()
        }
        StaticError::Thumbnail { .. } | StaticError::Worker(_) | StaticError::Io { .. } => {
            http::build_500_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::thumbnail::fixtures;
    use super::*;
    use http_body_util::BodyExt;
    use std::fs as stdfs;

    async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
        resp.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    fn root_with_music() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        stdfs::create_dir_all(dir.path().join("music")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_404() {
        let root = root_with_music();
        let assets = StaticAssets::new(root.path(), 4);

        let resp = assets.serve("/music/icon.xyz").await;
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.headers()["Content-Type"], "text/html");
        assert_eq!(body_bytes(resp).await, b"404: File not found");
    }

    #[tokio::test]
    async fn test_single_image_thumbnail() {
        let root = root_with_music();
        stdfs::write(root.path().join("music/cover.png"), fixtures::png(64, 32)).unwrap();
        let assets = StaticAssets::new(root.path(), 4);

        let resp = assets.serve("/music/cover.png").await;
        assert_eq!(resp.status(), 200);
        // Always the thumbnail type, not the table's image/png
        assert_eq!(resp.headers()["Content-Type"], "image/jpeg");
        let img = image::load_from_memory(&body_bytes(resp).await).unwrap();
        assert_eq!((img.width(), img.height()), (200, 200));
    }

    #[tokio::test]
    async fn test_extensionless_prefers_html_sibling() {
        let root = root_with_music();
        // An image stored under an .html name resolves and renders
        stdfs::write(root.path().join("music/about.html"), fixtures::png(8, 8)).unwrap();
        let assets = StaticAssets::new(root.path(), 4);

        let resolved = assets
            .resolve_extensionless(Path::new("music/about"))
            .await;
        assert_eq!(resolved, root.path().join("music/about.html"));

        let fallback = assets
            .resolve_extensionless(Path::new("music/missing"))
            .await;
        assert_eq!(fallback, root.path().join("music/missing/index.html"));

        let resp = assets.serve("/music/about").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Type"], "image/jpeg");
    }

    #[tokio::test]
    async fn test_directory_of_images() {
        let root = root_with_music();
        let gallery = root.path().join("music/gallery");
        stdfs::create_dir_all(&gallery).unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            stdfs::write(gallery.join(name), fixtures::png(40, 40)).unwrap();
        }
        let assets = StaticAssets::new(root.path(), 2);

        let resp = assets.serve("/music/gallery").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Type"], "image/jpeg");

        let items: Vec<serde_json::Value> =
            serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(items.len(), 3);
        for item in items {
            assert_eq!(item["type"], "Buffer");
            let data: Vec<u8> = serde_json::from_value(item["data"].clone()).unwrap();
            let img = image::load_from_memory(&data).unwrap();
            assert_eq!((img.width(), img.height()), (100, 100));
        }
    }

    #[tokio::test]
    async fn test_directory_with_single_thumbnail_slot() {
        let root = root_with_music();
        let gallery = root.path().join("music/queue");
        stdfs::create_dir_all(&gallery).unwrap();
        for i in 0..5 {
            stdfs::write(gallery.join(format!("{i}.png")), fixtures::png(30, 30)).unwrap();
        }
        // Zero is raised to one slot
        let assets = StaticAssets::new(root.path(), 0);
        assert_eq!(assets.limiter.available_permits(), 1);

        let resp = assets.serve("/music/queue").await;
        assert_eq!(resp.status(), 200);
        let items: Vec<serde_json::Value> =
            serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(items.len(), 5);
        assert!(items.iter().all(|item| item["type"] == "Buffer"));

        // Every permit is returned once rendering is done
        assert_eq!(assets.limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_directory_degrades_on_bad_entry() {
        let root = root_with_music();
        let gallery = root.path().join("music/mixed");
        stdfs::create_dir_all(&gallery).unwrap();
        stdfs::write(gallery.join("1.png"), fixtures::png(20, 20)).unwrap();
        stdfs::write(gallery.join("2.txt"), "plain text").unwrap();
        stdfs::write(gallery.join("3.png"), fixtures::png(20, 20)).unwrap();
        let assets = StaticAssets::new(root.path(), 4);

        let resp = assets.serve("/music/mixed").await;
        assert_eq!(resp.status(), 200);
        let items: Vec<serde_json::Value> =
            serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["type"], "Buffer");
        assert!(items[1].is_null());
        assert_eq!(items[2]["type"], "Buffer");
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let root = root_with_music();
        let assets = StaticAssets::new(root.path(), 4);
        let resp = assets.serve("/music/nothing.png").await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_undecodable_file_is_500() {
        let root = root_with_music();
        stdfs::write(root.path().join("music/broken.jpg"), "not a jpeg").unwrap();
        let assets = StaticAssets::new(root.path(), 4);
        let resp = assets.serve("/music/broken.jpg").await;
        assert_eq!(resp.status(), 500);
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let root = root_with_music();
        let assets = StaticAssets::new(root.path(), 4);
        let resp = assets.serve("/music/../../etc/passwd.html").await;
        assert_eq!(resp.status(), 404);
    }

    #[test]
    fn test_encoded_thumbnail_shape() {
        let json = serde_json::to_string(&vec![Some(EncodedThumbnail { data: vec![1, 2] }), None])
            .unwrap();
        assert_eq!(json, r#"[{"type":"Buffer","data":[1,2]},null]"#);
    }
}
