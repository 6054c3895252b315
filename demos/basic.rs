//! Minimal braid example: one shared base chain, two endpoints.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i http://localhost:3000/admin
//!   curl -i -H 'authorization: Bearer demo' http://localhost:3000/admin
//!
//! The bind address comes from `BRAID_ADDR` (default `127.0.0.1:3000`).

use std::net::SocketAddr;
use std::time::Instant;

use braid::{Chain, Composed, Context, Next, Request, Response, middleware};
use http::StatusCode;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let addr: SocketAddr = std::env::var("BRAID_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_owned())
        .parse()
        .expect("BRAID_ADDR must be host:port");

    // Every route shares the base; admin routes extend it.
    let base = Chain::new([middleware::from_fn(access_log)]);
    let admin = base.append([middleware::from_fn(require_auth)]);

    let index = base.then(index);
    let dashboard = admin.then(dashboard);

    let listener = TcpListener::bind(addr).await.expect("bind failed");
    info!(%addr, "braid demo listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                error!("accept error: {e}");
                continue;
            }
        };

        let (index, dashboard) = (index.clone(), dashboard.clone());
        tokio::spawn(async move {
            // The host owns routing; braid only hands back one service per pipe.
            let svc = hyper::service::service_fn(move |req: http::Request<hyper::body::Incoming>| {
                let admin = req.uri().path().starts_with("/admin");
                let pipe: &Composed = if admin { &dashboard } else { &index };
                hyper::service::Service::call(pipe, req)
            });

            if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), svc)
                .await
            {
                error!(%peer, "connection error: {e}");
            }
        });
    }
}

async fn access_log(ctx: Context, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let (method, path) = (req.method().clone(), req.path().to_owned());
    let res = next.serve(ctx.clone(), req).await;
    info!(
        id = ?ctx.request_id(),
        %method,
        %path,
        status = res.status_code().as_u16(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "request",
    );
    res
}

async fn require_auth(ctx: Context, req: Request, next: Next) -> Response {
    if req.header("authorization") != Some("Bearer demo") {
        return Response::status(StatusCode::UNAUTHORIZED);
    }
    next.serve(ctx, req).await
}

async fn index(_ctx: Context, _req: Request) -> &'static str {
    "index"
}

async fn dashboard(ctx: Context, _req: Request) -> String {
    let id = ctx.request_id().map(|id| id.to_string()).unwrap_or_default();
    format!("dashboard for request {id}")
}
