//! Error types.
//!
//! [`Error`] is what a recovered panic becomes once it has been normalized.
//! [`NetError`] marks a failed network operation, the shape transport code
//! should raise so the broken-pipe check can find it. [`Aborted`] is what the
//! host sees when a response must not be written at all.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Alias for a type-erased, thread-safe error.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A recovered fault, normalized into something with an error contract.
///
/// A panic payload that already is an error is kept as-is, so its cause
/// chain stays walkable. Anything else keeps only its string form.
#[derive(Debug)]
pub enum Error {
    Source(BoxError),
    Message(String),
}

impl Error {
    /// Wrap an existing error.
    pub fn new<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Source(err.into())
    }

    /// A bare message with no cause.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Normalize a payload returned by `catch_unwind`.
    ///
    /// Payloads raised with `panic!("...")` are `&'static str` or `String`.
    /// Payloads raised with `std::panic::panic_any(err)` keep their error
    /// type when it is one of the types below.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<Error>() {
            Ok(err) => return *err,
            Err(p) => p,
        };
        let payload = match payload.downcast::<BoxError>() {
            Ok(err) => return Self::Source(*err),
            Err(p) => p,
        };
        let payload = match payload.downcast::<NetError>() {
            Ok(err) => return Self::new(*err),
            Err(p) => p,
        };
        let payload = match payload.downcast::<io::Error>() {
            Ok(err) => return Self::new(*err),
            Err(p) => p,
        };
        let payload = match payload.downcast::<String>() {
            Ok(s) => return Self::Message(*s),
            Err(p) => p,
        };
        match payload.downcast::<&'static str>() {
            Ok(s) => Self::Message((*s).to_owned()),
            Err(_) => Self::Message("Box<dyn Any>".to_owned()),
        }
    }

    /// The fault itself as a trait object: the wrapped error for
    /// [`Error::Source`], `self` for [`Error::Message`].
    pub fn as_dyn(&self) -> &(dyn StdError + 'static) {
        match self {
            Self::Source(err) => &**err,
            Self::Message(_) => self,
        }
    }

    /// Iterate the fault and every wrapped cause, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        std::iter::successors(Some(self.as_dyn()), |&err| err.source())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(err) => fmt::Display::fmt(err, f),
            Self::Message(msg) => f.write_str(msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Source(err) => err.source(),
            Self::Message(_) => None,
        }
    }
}

/// A failed network operation: which operation, and the I/O error it hit.
///
/// ```
/// use std::io;
/// use backstop::NetError;
///
/// let err = NetError::new("write", io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
/// assert_eq!(err.to_string(), "write: broken pipe");
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{op}: {source}")]
pub struct NetError {
    op: &'static str,
    #[source]
    source: io::Error,
}

impl NetError {
    pub fn new(op: &'static str, source: io::Error) -> Self {
        Self { op, source }
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    /// The I/O error the operation failed with.
    pub fn inner(&self) -> &io::Error {
        &self.source
    }
}

/// Returned to the host in place of a response when processing was aborted.
///
/// Hyper closes the connection without writing when a service yields an
/// error, which is exactly what an aborted response asks for.
#[derive(Debug)]
pub struct Aborted {
    cause: Option<Arc<Error>>,
}

impl Aborted {
    pub(crate) fn new(cause: Option<Arc<Error>>) -> Self {
        Self { cause }
    }

    /// The first fault recorded on the aborted response, if any.
    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_deref()
    }
}

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "request aborted: {cause}"),
            None => f.write_str("request aborted"),
        }
    }
}

impl StdError for Aborted {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|err| err as &(dyn StdError + 'static))
    }
}
