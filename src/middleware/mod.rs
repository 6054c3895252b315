//! Helpers for writing middleware constructors.
//!
//! braid ships no middleware of its own. Authentication, rate limiting and
//! request logging are the application's business; this module only makes
//! writing them shorter.
//!
//! A hand-written [`Constructor`] has to build a new handler around `next`.
//! [`from_fn`] does that part, leaving just the per-request logic:
//!
//! ```rust
//! use braid::{Chain, Context, Next, Request, Response, middleware};
//! use http::StatusCode;
//!
//! async fn require_token(ctx: Context, req: Request, next: Next) -> Response {
//!     if req.header("authorization").is_none() {
//!         return Response::status(StatusCode::UNAUTHORIZED);
//!     }
//!     next.serve(ctx, req).await
//! }
//!
//! let chain = Chain::new([middleware::from_fn(require_token)]);
//! # let _ = chain;
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::chain::Constructor;
use crate::context::Context;
use crate::handler::SharedHandler;
use crate::request::Request;
use crate::response::Response;

/// The rest of the chain, as seen from inside a layer.
pub type Next = SharedHandler;

/// Builds a [`Constructor`] from an async function of the request and the
/// rest of the chain.
///
/// The function itself is shared by every fold of the chain; each fold still
/// gets its own layer wrapping its own `next`.
pub fn from_fn<F, Fut>(f: F) -> Constructor
where
    F: Fn(Context, Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let f = Arc::new(f);
    Constructor::new(move |_ctx: &Context, next: SharedHandler| -> SharedHandler {
        let f = Arc::clone(&f);
        Arc::new(move |ctx: Context, req: Request| f(ctx, req, Arc::clone(&next)))
    })
}
