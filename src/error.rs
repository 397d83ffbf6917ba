//! Unified error type.
//!
//! Every failure veneer can produce is a *decoration-time* failure: a
//! misconfigured duplicate group, a decorator factory called with the wrong
//! number of arguments, a class or method the registry has never seen. All of
//! them surface synchronously from the decoration APIs, which in practice
//! means at application start-up, not under load.
//!
//! Call-time errors belong to the wrapped user code. veneer never catches,
//! wraps, or suppresses anything a decorator or view raises — it propagates
//! unchanged, causality intact.

use std::fmt;

use crate::registry::ClassId;

/// The error type returned by veneer's fallible operations.
#[derive(Debug)]
pub enum Error {
    /// A duplicate-control key (`priority`, `keep_newest`, `handler`) was
    /// supplied without a `group` to resolve within.
    MissingDuplicateGroup,
    /// Two members of one duplicate group carry distinct custom handlers.
    ConflictingDuplicateHandlers {
        /// The offending group id.
        group: String,
    },
    /// The decoration target was not a callable or a registered class.
    NotDecoratable {
        /// Description of what was supplied instead.
        supplied: String,
    },
    /// A decorator factory was called with an argument count its declared
    /// arity cannot accept.
    ArityMismatch {
        /// The factory's name.
        decorator: String,
        /// Mandatory parameter count.
        required: usize,
        /// Optional parameter count.
        optional: usize,
        /// Arguments actually supplied (positional + keyword).
        supplied: usize,
    },
    /// The single-argument disambiguation hook contradicted the factory's
    /// declared arity, and no safe default applies.
    AmbiguousUsage {
        /// The factory's name.
        decorator: String,
    },
    /// A [`ClassId`] unknown to the registry.
    UnknownClass(ClassId),
    /// No class in the hierarchy defines the requested method.
    UnknownMethod {
        /// The class the lookup started from.
        class: String,
        /// The method name.
        method: String,
    },
    /// A class definition declared the same method name twice.
    MethodRedefined {
        /// The class being defined.
        class: String,
        /// The method name.
        method: String,
    },
}

impl Error {
    /// `true` for every variant except [`Error::AmbiguousUsage`].
    ///
    /// Configuration errors are mistakes at the decoration site; ambiguity
    /// is a property of the factory's declared arity and can only be fixed
    /// by the decorator author.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::AmbiguousUsage { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDuplicateGroup => {
                write!(f, "duplicate-control options were given without a duplicate group id")
            }
            Self::ConflictingDuplicateHandlers { group } => {
                write!(f, "duplicate group `{group}` has conflicting custom handlers")
            }
            Self::NotDecoratable { supplied } => {
                write!(f, "cannot decorate {supplied}: not a callable or registered class")
            }
            Self::ArityMismatch { decorator, required, optional, supplied } => {
                write!(
                    f,
                    "decorator `{decorator}` takes {required} required and {optional} optional \
                     argument(s), got {supplied}"
                )
            }
            Self::AmbiguousUsage { decorator } => {
                write!(
                    f,
                    "cannot decide whether `{decorator}` was used bare or with arguments; \
                     pass the argument as a keyword instead"
                )
            }
            Self::UnknownClass(id) => write!(f, "class {id:?} is not registered"),
            Self::UnknownMethod { class, method } => {
                write!(f, "no class in the hierarchy of `{class}` defines `{method}`")
            }
            Self::MethodRedefined { class, method } => {
                write!(f, "class `{class}` defines method `{method}` twice")
            }
        }
    }
}

impl std::error::Error for Error {}
