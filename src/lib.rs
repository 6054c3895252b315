//! # braid
//!
//! Middleware chains for hyper services. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! You bring the middleware and the endpoint. braid folds them into one
//! handler:
//!
//! ```text
//! Chain::new([logger, auth]).then(index)   ==   logger(auth(index))
//!
//! request → logger → auth → index
//! ```
//!
//! - **Ordered**: the first constructor is the outermost layer and sees the
//!   request first.
//! - **Immutable**: [`Chain::append`] returns a new chain; the original keeps
//!   its behaviour and can be shared by any number of routes.
//! - **Context-carrying**: every layer receives a [`Context`]; each request
//!   gets its own child of it, tagged with a [`RequestId`].
//!
//! What braid intentionally leaves to the host: transport, routing, request
//! parsing, and the behaviour of any particular middleware.
//!
//! ## Quick start
//!
//! ```rust
//! use braid::{Chain, Context, Next, Request, Response, middleware};
//! use http::StatusCode;
//!
//! async fn auth(ctx: Context, req: Request, next: Next) -> Response {
//!     if req.header("authorization").is_none() {
//!         return Response::status(StatusCode::UNAUTHORIZED);
//!     }
//!     next.serve(ctx, req).await
//! }
//!
//! async fn index(_ctx: Context, _req: Request) -> &'static str {
//!     "index"
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let base = Chain::new([middleware::from_fn(auth)]);
//! let app = base.then(index);
//!
//! let req = Request::from(http::Request::get("/").body(bytes::Bytes::new()).unwrap());
//! let res = app.invoke(req).await;
//! assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
//! # }
//! ```
//!
//! [`Composed`] is a `hyper::service::Service`, so `app` can be handed to a
//! hyper connection builder as-is.

mod chain;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod service;

pub mod middleware;

pub use chain::{Chain, Constructor};
pub use context::{Context, RequestId};
pub use error::Error;
pub use handler::{BoxFuture, Handler, HandlerFn, IntoHandler, SharedHandler};
pub use middleware::Next;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use service::{Composed, Infallibly};
