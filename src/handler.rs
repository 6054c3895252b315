//! The handler capability and its type-erased form.
//!
//! # How layers are stored
//!
//! A chain folds handlers of *different* concrete types into one pipeline:
//! the terminal is a user function, every layer around it is a closure built by
//! a [`Constructor`](crate::Constructor). Each layer only knows "the next
//! handler", so the next handler is held as a trait object:
//!
//! ```text
//! async fn index(ctx, req) -> Response { … }     ← user writes this
//!        ↓ chain.then(index)
//! index.into_handler()                           ← IntoHandler blanket impl
//!        ↓
//! Arc::new(index)                                ← SharedHandler
//!        ↓  auth(&ctx, next) → logger(&ctx, next)  (right to left)
//! handler.serve(ctx, req)  at request time       ← one vtable call per layer
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` let the host runtime move the future across threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// The type-erased handler passed between layers of a chain.
///
/// `Arc` lets every layer hold the next one and lets the composed handler be
/// shared across concurrent requests.
pub type SharedHandler = Arc<dyn Handler>;

// ── Handler ──────────────────────────────────────────────────────────────────

/// Handles a request given a context.
///
/// The terminal handler and every wrapping layer share this one capability.
/// You rarely implement it by hand: any function with the shape
///
/// ```text
/// async fn name(ctx: Context, req: Request) -> impl IntoResponse
/// ```
///
/// already is a `Handler`. Implement it directly for handlers that carry
/// state:
///
/// ```rust
/// use braid::{BoxFuture, Context, Handler, Request, Response};
///
/// struct Greeting(&'static str);
///
/// impl Handler for Greeting {
///     fn serve(&self, _ctx: Context, _req: Request) -> BoxFuture {
///         let body = self.0;
///         Box::pin(async move { Response::text(body) })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, ctx: Context, req: Request) -> BoxFuture;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn serve(&self, ctx: Context, req: Request) -> BoxFuture {
        let fut = self(ctx, req);
        Box::pin(async move { fut.await.into_response() })
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve(&self, ctx: Context, req: Request) -> BoxFuture {
        (**self).serve(ctx, req)
    }
}

// ── HandlerFn ────────────────────────────────────────────────────────────────

/// Names a bare function as a [`Handler`].
///
/// Functions are handlers already; the wrapper exists for places that want a
/// concrete, nameable type (struct fields, `Option<HandlerFn<F>>`).
#[derive(Clone, Copy, Debug)]
pub struct HandlerFn<F>(F);

impl<F> HandlerFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F, Fut, R> Handler for HandlerFn<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn serve(&self, ctx: Context, req: Request) -> BoxFuture {
        self.0.serve(ctx, req)
    }
}

// ── IntoHandler ──────────────────────────────────────────────────────────────

/// Anything a chain accepts as its terminal.
///
/// Implemented for every [`Handler`] and for `Option<H>`. `None` is the
/// absence value: folding it panics, exactly like a missing handler.
pub trait IntoHandler {
    #[doc(hidden)]
    fn into_handler(self) -> Option<SharedHandler>;
}

impl<H: Handler> IntoHandler for H {
    fn into_handler(self) -> Option<SharedHandler> {
        Some(Arc::new(self))
    }
}

impl<H: Handler> IntoHandler for Option<H> {
    fn into_handler(self) -> Option<SharedHandler> {
        self.map(|h| Arc::new(h) as SharedHandler)
    }
}
