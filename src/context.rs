//! The value carried through every layer of a chain.
//!
//! A [`Context`] is an immutable linked list of typed values. Deriving a child
//! with [`Context::with_value`] allocates one node that points at its parent,
//! so a context can be cloned and handed to every layer for the price of an
//! `Arc` increment, and no layer can change what its caller sees.
//!
//! ```text
//! background ← RequestId(7) ← UserId("alice")      (child → root lookup)
//! ```
//!
//! Lookups walk from the newest node towards the root and return the first
//! value of the requested type, so a child shadows its parent.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// An opaque, cheaply clonable carrier of request-scoped values.
///
/// ```rust
/// use braid::Context;
///
/// #[derive(Debug, PartialEq)]
/// struct Tenant(&'static str);
///
/// let root = Context::background();
/// let child = root.with_value(Tenant("acme"));
///
/// assert_eq!(child.value::<Tenant>(), Some(&Tenant("acme")));
/// assert_eq!(root.value::<Tenant>(), None);
/// ```
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
}

struct Node {
    parent: Option<Arc<Node>>,
    value: Box<dyn Any + Send + Sync>,
}

impl Context {
    /// The empty root context. Every fold starts from one of these.
    pub fn background() -> Self {
        Self { head: None }
    }

    /// Returns a child context that carries `value` on top of `self`.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        Self {
            head: Some(Arc::new(Node {
                parent: self.head.clone(),
                value: Box::new(value),
            })),
        }
    }

    /// The nearest value of type `T`, if any layer attached one.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        let mut node = self.head.as_deref();
        while let Some(n) = node {
            if let Some(v) = n.value.downcast_ref::<T>() {
                return Some(v);
            }
            node = n.parent.as_deref();
        }
        None
    }

    /// `true` for a context with no values attached.
    pub fn is_background(&self) -> bool {
        self.head.is_none()
    }

    /// The request id attached by [`Composed::invoke`](crate::Composed::invoke).
    pub fn request_id(&self) -> Option<RequestId> {
        self.value::<RequestId>().copied()
    }

    fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.head.as_deref();
        while let Some(n) = node {
            depth += 1;
            node = n.parent.as_deref();
        }
        depth
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.depth())
            .field("request_id", &self.request_id())
            .finish()
    }
}

// ── RequestId ─────────────────────────────────────────────────────────────────

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one invocation of a composed chain.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
