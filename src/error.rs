//! Unified error type.

use std::fmt;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by braid's fallible operations.
///
/// Middleware and handler failures are expressed as
/// [`Response`](crate::Response) values, not as `Error`s. This type only
/// surfaces the one thing that can go wrong at the hyper boundary: reading the
/// request body before the chain runs.
#[derive(Debug)]
pub struct Error(BoxError);

impl Error {
    pub(crate) fn body(e: impl Into<BoxError>) -> Self {
        Self(e.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body: {}", self.0)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.0)
    }
}
