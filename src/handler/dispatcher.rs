//! Request dispatch
//!
//! Per request, in this order:
//! 1. Paths under the static prefix go to [`StaticAssets`] and nothing else runs.
//! 2. Route entries are scanned in registration order; the first whose
//!    template accepts the path and which has a handler for the method wins.
//! 3. A match fires the middleware chain, extracts parameters, aggregates the
//!    body, adds CORS headers and calls the handler with a [`ResponseSink`].
//! 4. No match answers 404 with the not-found document, read from disk on
//!    every miss.

use super::body;
use super::context::{RequestContext, RequestHead, ResponseSink};
use super::static_files::StaticAssets;
use crate::config::{Config, CorsConfig};
use crate::error::{BodyReadError, DispatchError};
use crate::http::{self, cors, Body};
use crate::logger;
use crate::routing::middleware::{self, Middleware};
use crate::routing::{Handler, Matcher, RouteTable};
use hyper::body::Bytes;
use hyper::{Request, Response};
use std::collections::HashMap;
use std::path::PathBuf;

/// Dispatcher settings taken from configuration
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub static_prefix: String,
    pub static_root: PathBuf,
    pub thumbnail_concurrency: usize,
    pub not_found_page: PathBuf,
    /// `None` disables CORS headers
    pub cors: Option<CorsConfig>,
    /// 0 disables the limit
    pub max_body_size: u64,
}

impl DispatchSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            static_prefix: cfg.static_files.prefix.clone(),
            static_root: PathBuf::from(&cfg.static_files.root),
            thumbnail_concurrency: cfg.static_files.thumbnail_concurrency,
            not_found_page: PathBuf::from(&cfg.not_found.page),
            cors: cfg.http.enable_cors.then(|| cfg.http.cors.clone()),
            max_body_size: cfg.http.max_body_size,
        }
    }
}

/// Which branch produced a response, attached as a response extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Matched route template
    Route(String),
    Static,
    NotFound,
}

impl Resolution {
    pub fn label(&self) -> &str {
        match self {
            Self::Route(template) => template,
            Self::Static => "static",
            Self::NotFound => "not_found",
        }
    }
}

/// Outcome of the route scan for one request
pub struct MatchResult<'a> {
    pub template: &'a str,
    pub handler: &'a Handler,
    pub middleware: &'a [Middleware],
    matcher: &'a Matcher,
}

impl MatchResult<'_> {
    pub fn params(&self, path: &str) -> HashMap<String, String> {
        self.matcher.extract_params(path)
    }
}

/// Frozen route table plus the fallbacks
pub struct Dispatcher {
    table: RouteTable,
    global_middleware: Vec<Middleware>,
    static_assets: StaticAssets,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub(crate) fn new(
        table: RouteTable,
        global_middleware: Vec<Middleware>,
        settings: DispatchSettings,
    ) -> Self {
        let static_assets =
            StaticAssets::new(&settings.static_root, settings.thumbnail_concurrency);
        Self {
            table,
            global_middleware,
            static_assets,
            settings,
        }
    }

    pub const fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub const fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Produce the response for one request
    ///
    /// Only an unreadable not-found document is an error; every other failure
    /// is answered with a response.
    pub async fn dispatch<B>(&self, req: Request<B>) -> Result<Response<Body>, DispatchError>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: std::fmt::Display,
    {
        let path = req.uri().path();
        if path.starts_with(&self.settings.static_prefix) {
            let mut resp = self.static_assets.serve(path).await;
            resp.extensions_mut().insert(Resolution::Static);
            return Ok(resp);
        }

        let method = req.method().as_str().to_ascii_lowercase();
        match self.find_route(&method, path) {
            Some(found) => Ok(self.invoke(found, req).await),
            None => {
                logger::log_debug(&format!("[Dispatch] {method} {path} -> no route"));
                self.not_found().await
            }
        }
    }

    /// First entry, in registration order, accepting `path` for `method`
    pub fn find_route(&self, method: &str, path: &str) -> Option<MatchResult<'_>> {
        self.table.iter().find_map(|(template, entry)| {
            let matcher = entry.matcher(template)?;
            if !matcher.test(path) {
                return None;
            }
            let handler = entry.handler_for(method)?;
            Some(MatchResult {
                template,
                handler,
                middleware: entry.middleware(),
                matcher,
            })
        })
    }

    async fn invoke<B>(&self, found: MatchResult<'_>, req: Request<B>) -> Response<Body>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: std::fmt::Display,
    {
        let (parts, req_body) = req.into_parts();
        let head = RequestHead::from_parts(&parts);
        logger::log_debug(&format!(
            "[Dispatch] {} {} -> {}",
            head.method, head.path, found.template
        ));

        let (mut sink, finalized) = ResponseSink::channel();
        middleware::run_all(
            self.global_middleware.iter().chain(found.middleware),
            &head,
            &mut sink,
            found.template,
        );

        let params = found.params(&head.path);
        let body = match body::aggregate(req_body, self.settings.max_body_size).await {
            Ok(text) => text,
            Err(e) => {
                logger::log_warning(&format!("{} {}: {e}", head.method, head.path));
                sink.discard();
                return match e {
                    BodyReadError::TooLarge { .. } => http::build_413_response(),
                    BodyReadError::Read(reason) => http::build_400_response(&reason),
                };
            }
        };

        if let Some(cors_config) = &self.settings.cors {
            cors::apply(&mut sink, cors_config);
        }

        let ctx = RequestContext { head, params, body };
        (found.handler)(ctx, sink);

        let mut resp = finalized.await.unwrap_or_else(|_| {
            logger::log_error(&format!("Handler for {} produced no response", found.template));
            http::build_500_response()
        });
        resp.extensions_mut()
            .insert(Resolution::Route(found.template.to_string()));
        resp
    }

    /// 404 with the not-found document
    pub async fn not_found(&self) -> Result<Response<Body>, DispatchError> {
        let document = self.read_not_found_page().await?;
        let mut resp = http::build_not_found_page(document);
        resp.extensions_mut().insert(Resolution::NotFound);
        Ok(resp)
    }

    /// Fail early when the not-found document is unreadable
    pub async fn check_not_found_page(&self) -> Result<(), DispatchError> {
        self.read_not_found_page().await.map(|_| ())
    }

    async fn read_not_found_page(&self) -> Result<String, DispatchError> {
        let path = &self.settings.not_found_page;
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DispatchError::NotFoundAsset {
                path: path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::body::test_bodies::{Chunked, Failing};
    use crate::routing::{middleware, Router};
    use http_body_util::{BodyExt, Empty};
    use hyper::Method;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const NOT_FOUND_HTML: &str = "<h1>Nothing here</h1>";

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("404.html"), NOT_FOUND_HTML).unwrap();
        std::fs::create_dir_all(dir.path().join("public/music")).unwrap();
        dir
    }

    fn settings(dir: &TempDir) -> DispatchSettings {
        DispatchSettings {
            static_prefix: "/music".to_string(),
            static_root: dir.path().join("public"),
            thumbnail_concurrency: 2,
            not_found_page: dir.path().join("404.html"),
            cors: Some(CorsConfig::default()),
            max_body_size: 1024,
        }
    }

    fn request(method: &str, uri: &str) -> Request<Empty<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Empty::new())
            .unwrap()
    }

    async fn text(resp: Response<Body>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn reply(label: &'static str) -> impl Fn(RequestContext, ResponseSink) + Send + Sync + 'static {
        move |_, mut sink| {
            sink.write(label);
            sink.end();
        }
    }

    #[tokio::test]
    async fn test_overwrite_drops_other_methods() {
        let dir = fixture();
        let mut router = Router::new();
        router
            .get("/items", reply("get"), [])
            .post("/items", reply("post"), []);
        let dispatcher = router.into_dispatcher(settings(&dir));

        let resp = dispatcher.dispatch(request("GET", "/items")).await.unwrap();
        assert_eq!(resp.status(), 404);
        assert_eq!(text(resp).await, NOT_FOUND_HTML);

        let resp = dispatcher.dispatch(request("POST", "/items")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(text(resp).await, "post");
    }

    #[tokio::test]
    async fn test_first_match_wins_over_more_specific() {
        let dir = fixture();
        let mut router = Router::new();
        router
            .get("/users", reply("coarse"), [])
            .get("/users/:id", reply("specific"), []);
        let dispatcher = router.into_dispatcher(settings(&dir));

        let resp = dispatcher.dispatch(request("GET", "/users/42")).await.unwrap();
        assert_eq!(text(resp).await, "coarse");
    }

    #[tokio::test]
    async fn test_method_mismatch_keeps_scanning_then_falls_through() {
        let dir = fixture();
        let mut router = Router::new();
        router
            .post("/users", reply("create"), [])
            .get("/users/:id", reply("show"), []);
        let dispatcher = router.into_dispatcher(settings(&dir));

        let resp = dispatcher.dispatch(request("GET", "/users/7")).await.unwrap();
        assert_eq!(text(resp).await, "show");

        let resp = dispatcher.dispatch(request("PUT", "/users/7")).await.unwrap();
        assert_eq!(resp.status(), 404);
        assert_eq!(
            resp.extensions().get::<Resolution>(),
            Some(&Resolution::NotFound)
        );
    }

    #[tokio::test]
    async fn test_method_compared_case_insensitively() {
        let dir = fixture();
        let mut router = Router::new();
        router.get("/ping", reply("pong"), []);
        let dispatcher = router.into_dispatcher(settings(&dir));

        let req = Request::builder()
            .method(Method::from_bytes(b"Get").unwrap())
            .uri("/ping")
            .body(Empty::<Bytes>::new())
            .unwrap();
        let resp = dispatcher.dispatch(req).await.unwrap();
        assert_eq!(text(resp).await, "pong");
    }

    #[tokio::test]
    async fn test_params_body_and_cors_reach_handler() {
        let dir = fixture();
        let mut router = Router::new();
        router.post(
            "/users/:id/notes",
            |ctx: RequestContext, mut sink: ResponseSink| {
                let id = ctx.param("id").unwrap_or("-").to_string();
                sink.set_status(hyper::StatusCode::CREATED)
                    .write(format!("{id}:{}", ctx.body));
                sink.end();
            },
            [],
        );
        let dispatcher = router.into_dispatcher(settings(&dir));

        let req = Request::builder()
            .method("POST")
            .uri("/users/9/notes?draft=1")
            .body(Chunked::new(&["hello ", "world"]))
            .unwrap();
        let resp = dispatcher.dispatch(req).await.unwrap();
        assert_eq!(resp.status(), 201);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert_eq!(
            resp.extensions().get::<Resolution>(),
            Some(&Resolution::Route("/users/:id/notes".to_string()))
        );
        assert_eq!(text(resp).await, "9:hello world");
    }

    #[tokio::test]
    async fn test_middleware_order_and_no_wait() {
        let dir = fixture();
        let order = Arc::new(Mutex::new(Vec::new()));

        let record = |name: &'static str, order: &Arc<Mutex<Vec<&'static str>>>| {
            let order = Arc::clone(order);
            middleware(move |_, sink, _next| {
                // `_next` is dropped without being run
                order.lock().unwrap().push(name);
                sink.set_header(&format!("X-{name}"), "seen");
            })
        };

        let handler_order = Arc::clone(&order);
        let mut router = Router::new();
        router.use_middleware(record("global", &order));
        router.get(
            "/secure",
            move |_, sink: ResponseSink| {
                handler_order.lock().unwrap().push("handler");
                sink.end();
            },
            [
                vec![record("first", &order)],
                vec![record("second", &order), record("third", &order)],
            ],
        );
        let dispatcher = router.into_dispatcher(settings(&dir));

        let resp = dispatcher.dispatch(request("GET", "/secure")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["x-first"], "seen");
        assert_eq!(resp.headers()["x-third"], "seen");
        assert_eq!(
            *order.lock().unwrap(),
            vec!["global", "first", "second", "third", "handler"]
        );
    }

    #[tokio::test]
    async fn test_static_prefix_bypasses_routes() {
        let dir = fixture();
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);

        let mut router = Router::new();
        router.get(
            "/music/:file",
            move |_, sink: ResponseSink| {
                flag.store(true, Ordering::SeqCst);
                sink.end();
            },
            [],
        );
        let dispatcher = router.into_dispatcher(settings(&dir));

        let resp = dispatcher
            .dispatch(request("GET", "/music/icon.xyz"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        assert_eq!(
            resp.extensions().get::<Resolution>(),
            Some(&Resolution::Static)
        );
        assert_eq!(text(resp).await, "404: File not found");
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_body_error_fails_only_that_request() {
        let dir = fixture();
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);

        let mut router = Router::new();
        router.post(
            "/upload",
            move |_, sink: ResponseSink| {
                flag.store(true, Ordering::SeqCst);
                sink.end();
            },
            [],
        );
        let dispatcher = router.into_dispatcher(settings(&dir));

        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .body(Failing)
            .unwrap();
        let resp = dispatcher.dispatch(req).await.unwrap();
        assert_eq!(resp.status(), 400);
        assert!(!called.load(Ordering::SeqCst));

        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .body(Chunked::new(&["x"; 2000]))
            .unwrap();
        let resp = dispatcher.dispatch(req).await.unwrap();
        assert_eq!(resp.status(), 413);

        let resp = dispatcher.dispatch(request("POST", "/upload")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_handler_may_finish_later() {
        let dir = fixture();
        let mut router = Router::new();
        router.get(
            "/slow",
            |_, mut sink: ResponseSink| {
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    sink.write("done");
                    sink.end();
                });
            },
            [],
        );
        let dispatcher = router.into_dispatcher(settings(&dir));

        let resp = dispatcher.dispatch(request("GET", "/slow")).await.unwrap();
        assert_eq!(text(resp).await, "done");
    }

    #[tokio::test]
    async fn test_handler_dropping_sink_still_responds() {
        let dir = fixture();
        let mut router = Router::new();
        router.delete(
            "/items/:id",
            |_, mut sink: ResponseSink| {
                sink.set_status(hyper::StatusCode::NO_CONTENT);
            },
            [],
        );
        let dispatcher = router.into_dispatcher(settings(&dir));

        let resp = dispatcher
            .dispatch(request("DELETE", "/items/3"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 204);
    }

    #[tokio::test]
    async fn test_malformed_template_is_skipped() {
        let dir = fixture();
        let mut router = Router::new();
        router
            .get("/broken/:", reply("broken"), [])
            .get("/", reply("root"), []);
        let dispatcher = router.into_dispatcher(settings(&dir));

        let resp = dispatcher.dispatch(request("GET", "/broken/x")).await.unwrap();
        assert_eq!(text(resp).await, "root");
    }

    #[tokio::test]
    async fn test_missing_not_found_document_is_fatal() {
        let dir = fixture();
        let mut cfg = settings(&dir);
        cfg.not_found_page = dir.path().join("missing.html");
        let dispatcher = Router::new().into_dispatcher(cfg);

        assert!(dispatcher.check_not_found_page().await.is_err());
        let err = dispatcher
            .dispatch(request("GET", "/anything"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFoundAsset { .. }));
    }

    #[tokio::test]
    async fn test_not_found_document_read_per_request() {
        let dir = fixture();
        let dispatcher = Router::new().into_dispatcher(settings(&dir));

        let resp = dispatcher.dispatch(request("GET", "/a")).await.unwrap();
        assert_eq!(text(resp).await, NOT_FOUND_HTML);

        std::fs::write(dir.path().join("404.html"), "<p>updated</p>").unwrap();
        let resp = dispatcher.dispatch(request("GET", "/a")).await.unwrap();
        assert_eq!(text(resp).await, "<p>updated</p>");
    }
}
