use std::sync::Arc;

use hyper::StatusCode;
use rustroute::config::{self, AppState};
use rustroute::handler::{DispatchSettings, RequestContext, ResponseSink};
use rustroute::routing::{middleware, Middleware, Router};
use rustroute::{logger, server};

const LISTEN_BACKLOG: i32 = 128;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers.max(1));
        logger::log_info(&format!("Using {workers} worker threads"));
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let dispatcher = build_router().into_dispatcher(DispatchSettings::from_config(&cfg));
    dispatcher.check_not_found_page().await?;

    let listener = server::create_reusable_listener(addr, LISTEN_BACKLOG)?;
    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(AppState::new(cfg, dispatcher));
    server::start_signal_handler(Arc::clone(&state.shutdown))?;

    // Connections are spawned with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::serve(listener, Arc::clone(&state)))
        .await?;

    match state.fatal_error() {
        Some(reason) => Err(reason.into()),
        None => Ok(()),
    }
}

/// Routes served by the bundled binary
fn build_router() -> Router {
    let mut router = Router::new();
    router.use_middleware(request_logger());

    router
        .get("/health", |_, mut res: ResponseSink| {
            res.write("ok");
            res.end();
        }, [])
        .get("/users/:id", show_user, [vec![require_json_accept()]])
        .post("/echo", echo, []);
    router
}

fn request_logger() -> Middleware {
    middleware(|head, _res, next| {
        logger::log_debug(&format!("[Request] {} {}", head.method, head.path));
        next.run();
    })
}

fn require_json_accept() -> Middleware {
    middleware(|head, res, next| {
        let accepts_json = head
            .headers
            .get(hyper::header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|v| v.contains("json") || v.contains("*/*"));
        if !accepts_json {
            res.set_header("Warning", "199 - \"response is JSON\"");
        }
        next.run();
    })
}

fn show_user(req: RequestContext, mut res: ResponseSink) {
    let id = req.param("id").unwrap_or_default();
    res.json(&serde_json::json!({ "id": id }));
    res.end();
}

fn echo(req: RequestContext, mut res: ResponseSink) {
    if req.body.is_empty() {
        res.set_status(StatusCode::BAD_REQUEST).write("empty body");
    } else {
        res.set_header("Content-Type", "text/plain").write(req.body.as_bytes());
    }
    res.end();
}
