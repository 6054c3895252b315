//! The request/response adapter returned by [`Chain::then`](crate::Chain::then).
//!
//! # Which context does a handler see?
//!
//! Constructors run once per fold and all receive the same root context.
//! Requests are different: [`Composed::invoke`] derives a fresh child of that
//! root for every call and attaches a [`RequestId`] to it, so values one
//! request stores never leak into the next. Hosts that already have a
//! request-scoped context of their own pass it through
//! [`Composed::invoke_with`].

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::Service;
use tracing::{Instrument, debug_span, warn};

use crate::context::{Context, RequestId};
use crate::error::{BoxError, Error};
use crate::handler::{BoxFuture, SharedHandler};
use crate::request::Request;

/// A folded chain, ready to serve requests.
///
/// Cloning is cheap: both the composed handler and the fold-time context are
/// reference counted. `Composed` is a [`hyper::service::Service`], so it can be
/// handed straight to a hyper connection builder:
///
/// ```rust,no_run
/// # use braid::{Chain, Context, Request};
/// # async fn run(io: hyper_util::rt::TokioIo<tokio::net::TcpStream>) {
/// let app = Chain::default().then(|_ctx: Context, _req: Request| async { "hello" });
///
/// hyper::server::conn::http1::Builder::new()
///     .serve_connection(io, app)
///     .await
///     .unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct Composed {
    ctx: Context,
    handler: SharedHandler,
}

impl Composed {
    /// Adapts an already composed handler, e.g. the result of
    /// [`Chain::then_context`](crate::Chain::then_context), into a request
    /// adapter. Every [`invoke`](Composed::invoke) derives its request context
    /// from `ctx`.
    ///
    /// ```rust
    /// use braid::{Chain, Composed, Context, Request};
    ///
    /// let handler = Chain::default().then_context(|_ctx: Context, _req: Request| async { "ok" });
    /// let app = Composed::new(Context::background().with_value("tenant-a"), handler);
    /// assert_eq!(app.context().value::<&str>(), Some(&"tenant-a"));
    /// ```
    pub fn new(ctx: Context, handler: SharedHandler) -> Self {
        Self { ctx, handler }
    }

    /// The context request contexts are derived from: the fold's root for
    /// [`Chain::then`](crate::Chain::then), or the one given to
    /// [`new`](Composed::new).
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// The composed handler, outermost layer first.
    pub fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    /// Runs one request through the chain under a fresh request-scoped
    /// context.
    pub fn invoke(&self, req: Request) -> BoxFuture {
        let id = RequestId::next();
        let span = debug_span!("request", id = id.get(), method = %req.method(), path = req.path());
        let fut = self.handler.serve(self.ctx.with_value(id), req);
        Box::pin(fut.instrument(span))
    }

    /// Runs one request through the chain under a context supplied by the
    /// host.
    pub fn invoke_with(&self, ctx: Context, req: Request) -> BoxFuture {
        self.handler.serve(ctx, req)
    }
}

impl std::fmt::Debug for Composed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composed").field("ctx", &self.ctx).finish_non_exhaustive()
    }
}

// ── hyper boundary ────────────────────────────────────────────────────────────

type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<Full<Bytes>>, Error>> + Send>>;

/// Collects the body, then [`invoke`](Composed::invoke)s the chain.
///
/// The only failure is a body that cannot be read; everything the chain
/// decides is expressed as a response.
impl<B> Service<http::Request<B>> for Composed
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Error;
    type Future = ServiceFuture;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    let e = Error::body(e);
                    warn!(
                        method = %parts.method,
                        path = parts.uri.path(),
                        "failed to read request body: {e}",
                    );
                    return Err(e);
                }
            };

            let response = this.invoke(Request::from_parts(parts, body)).await;
            Ok(response.into_inner())
        })
    }
}

/// Wraps `Composed` for hosts that want an infallible service, answering
/// `400 Bad Request` when the body cannot be read.
#[derive(Clone, Debug)]
pub struct Infallibly(pub Composed);

impl<B> Service<http::Request<B>> for Infallibly
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let fut = self.0.call(req);
        Box::pin(async move {
            Ok(fut.await.unwrap_or_else(|_| {
                crate::Response::status(http::StatusCode::BAD_REQUEST).into_inner()
            }))
        })
    }
}
