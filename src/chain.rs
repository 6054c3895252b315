//! Middleware chains.
//!
//! A [`Chain`] is a frozen list of [`Constructor`]s. Nothing runs when the
//! chain is built; constructors are called by [`Chain::then`], once each,
//! right to left, so the first constructor ends up outermost:
//!
//! ```text
//! Chain::new([m1, m2, m3]).then(h)   ==   m1(m2(m3(h)))
//!
//! request → m1 → m2 → m3 → h
//! ```
//!
//! Because every fold calls the constructors again, one base chain can be
//! reused for many endpoints. Each endpoint gets its own instance of every
//! layer, so a layer that counts requests counts them per endpoint.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::Context;
use crate::handler::{HandlerFn, IntoHandler, SharedHandler};
use crate::request::Request;
use crate::response::IntoResponse;
use crate::service::Composed;

// ── Constructor ──────────────────────────────────────────────────────────────

type ConstructorFn = dyn Fn(&Context, SharedHandler) -> SharedHandler + Send + Sync;

/// Wraps the next handler of a chain with additional behaviour.
///
/// A constructor receives the fold's [`Context`] and the handler it wraps,
/// and returns the handler that takes its place.
///
/// ```rust
/// use std::sync::Arc;
/// use braid::{Constructor, Context, Request, SharedHandler};
///
/// let logger = Constructor::new(|_ctx: &Context, next: SharedHandler| -> SharedHandler {
///     Arc::new(move |ctx: Context, req: Request| {
///         let next = Arc::clone(&next);
///         async move {
///             tracing::info!(path = req.path(), "request");
///             next.serve(ctx, req).await
///         }
///     })
/// });
/// # let _ = logger;
/// ```
#[derive(Clone)]
pub struct Constructor(Arc<ConstructorFn>);

impl Constructor {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Context, SharedHandler) -> SharedHandler + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the constructor: wraps `next` and returns the new outer handler.
    pub fn wrap(&self, ctx: &Context, next: SharedHandler) -> SharedHandler {
        (self.0)(ctx, next)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Constructor(..)")
    }
}

// ── Chain ────────────────────────────────────────────────────────────────────

/// An immutable, ordered list of middleware constructors.
///
/// Once created a chain always holds the same constructors in the same order.
/// [`append`](Chain::append) returns a new chain; cloning shares the frozen
/// list.
///
/// ```rust
/// use braid::{Chain, Context, Request, middleware};
///
/// let std_stack = Chain::new([
///     middleware::from_fn(|ctx, req, next| async move { next.serve(ctx, req).await }),
/// ]);
///
/// let index = std_stack.then(|_ctx: Context, _req: Request| async { "index" });
/// let about = std_stack.then(|_ctx: Context, _req: Request| async { "about" });
/// # let _ = (index, about);
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    constructors: Arc<[Constructor]>,
}

impl Chain {
    /// Memorises `constructors` in order. They are not called until
    /// [`then`](Chain::then).
    pub fn new(constructors: impl IntoIterator<Item = Constructor>) -> Self {
        Self { constructors: constructors.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Extends the chain with `more`, as the last layers before the terminal.
    ///
    /// The receiver is left untouched:
    ///
    /// ```text
    /// std   = Chain::new([m1, m2])
    /// ext   = std.append([m3, m4])
    /// // std runs m1 → m2, ext runs m1 → m2 → m3 → m4
    /// ```
    pub fn append(&self, more: impl IntoIterator<Item = Constructor>) -> Self {
        let mut constructors = self.constructors.to_vec();
        constructors.extend(more);
        trace!(from = self.constructors.len(), to = constructors.len(), "chain extended");
        Self { constructors: constructors.into() }
    }

    /// Folds the chain around `handler` and returns the request adapter.
    ///
    /// # Panics
    ///
    /// Panics if `handler` is `None`.
    pub fn then(&self, handler: impl IntoHandler) -> Composed {
        let (ctx, handler) = self.fold(handler);
        Composed::new(ctx, handler)
    }

    /// Like [`then`](Chain::then), but returns the bare composed handler so it
    /// can be composed further.
    ///
    /// # Panics
    ///
    /// Panics if `handler` is `None`.
    pub fn then_context(&self, handler: impl IntoHandler) -> SharedHandler {
        self.fold(handler).1
    }

    /// `then(HandlerFn::new(f))`.
    ///
    /// # Panics
    ///
    /// Never: a bare function is always present. An absent function is
    /// spelled `then(None::<F>)`, which panics like any absent terminal.
    pub fn then_func<F, Fut, R>(&self, f: F) -> Composed
    where
        F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        self.then(HandlerFn::new(f))
    }

    /// `then_context(HandlerFn::new(f))`.
    ///
    /// # Panics
    ///
    /// Never; see [`then_func`](Chain::then_func). Use
    /// `then_context(None::<F>)` for the absent case.
    pub fn then_func_context<F, Fut, R>(&self, f: F) -> SharedHandler
    where
        F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        self.then_context(HandlerFn::new(f))
    }

    fn fold(&self, handler: impl IntoHandler) -> (Context, SharedHandler) {
        let Some(mut handler) = handler.into_handler() else {
            panic!("braid: terminal handler must not be None");
        };

        // One root per fold, shared by every constructor of this fold.
        let ctx = Context::background();
        for constructor in self.constructors.iter().rev() {
            handler = constructor.wrap(&ctx, handler);
        }

        debug!(layers = self.constructors.len(), "chain composed");
        (ctx, handler)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;

    use super::*;
    use crate::response::Response;

    fn get() -> Request {
        Request::from(http::Request::get("/").body(Bytes::new()).unwrap())
    }

    /// Layer that records `name` into `log` before passing the request on.
    fn tag(name: &'static str, log: Log) -> Constructor {
        Constructor::new(move |_ctx: &Context, next: SharedHandler| -> SharedHandler {
            let log = Arc::clone(&log);
            Arc::new(move |ctx: Context, req: Request| {
                log.lock().unwrap().push(name);
                next.serve(ctx, req)
            })
        })
    }

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn terminal(
        log: Log,
    ) -> impl Fn(Context, Request) -> std::future::Ready<Response> + Send + Sync + 'static {
        move |_ctx: Context, _req: Request| {
            log.lock().unwrap().push("h");
            std::future::ready(Response::text("h"))
        }
    }

    #[tokio::test]
    async fn first_constructor_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::new([
            tag("m1", log.clone()),
            tag("m2", log.clone()),
            tag("m3", log.clone()),
        ]);

        chain.then_context(terminal(log.clone())).serve(Context::background(), get()).await;

        assert_eq!(*log.lock().unwrap(), ["m1", "m2", "m3", "h"]);
    }

    #[test]
    fn constructors_run_right_to_left_once_per_fold() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let built = |name: &'static str| {
            let order = Arc::clone(&order);
            Constructor::new(move |_ctx: &Context, next: SharedHandler| {
                order.lock().unwrap().push(name);
                next
            })
        };
        let chain = Chain::new([built("a"), built("b")]);

        chain.then(terminal(Arc::default()));
        chain.then(terminal(Arc::default()));

        assert_eq!(*order.lock().unwrap(), ["b", "a", "b", "a"]);
    }

    #[test]
    fn every_constructor_sees_the_same_root_context() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let probe = || {
            let seen = Arc::clone(&seen);
            Constructor::new(move |ctx: &Context, next: SharedHandler| {
                seen.lock().unwrap().push(ctx.is_background());
                next
            })
        };

        Chain::new([probe(), probe(), probe()]).then(terminal(Arc::default()));

        assert_eq!(*seen.lock().unwrap(), [true, true, true]);
    }

    #[test]
    fn append_copies_instead_of_sharing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counting = || {
            let calls = Arc::clone(&calls);
            Constructor::new(move |_ctx: &Context, next: SharedHandler| {
                calls.fetch_add(1, Ordering::SeqCst);
                next
            })
        };

        let base = Chain::new([counting()]);
        let ext = base.append([counting(), counting()]);

        assert_eq!(base.len(), 1);
        assert_eq!(ext.len(), 3);
        assert!(!Arc::ptr_eq(&base.constructors, &ext.constructors));

        base.then(terminal(Arc::default()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        ext.then(terminal(Arc::default()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn empty_chain_is_valid() {
        let chain = Chain::default();
        assert!(chain.is_empty());
        assert_eq!(format!("{chain:?}"), "Chain { len: 0 }");
        chain.then(terminal(Arc::default()));
    }

    #[test]
    #[should_panic(expected = "terminal handler must not be None")]
    fn none_panics_on_empty_chain() {
        type Missing = HandlerFn<fn(Context, Request) -> std::future::Ready<Response>>;
        Chain::default().then(None::<Missing>);
    }
}
