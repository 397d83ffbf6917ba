//! The [`Decorator`] trait, the per-call [`Invocation`] context, and the
//! [`DecoratorFactory`] trait for parameterized decorators.
//!
//! A decorator is an *opaque, shared, stateless* transform. One decorator
//! value is reused across every target it is applied to — it is never copied
//! per decoration site, and it must not store per-application state. State
//! that belongs to one decoration site goes on the wrapper, via
//! [`Decorator::on_decoration`].

use std::any::Any;
use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::usage::{Arg, Arity, CallArgs, SingleArg};
use crate::view::{BoxFuture, ViewInstance};
use crate::wrap::Wrapper;

// ── Invocation ───────────────────────────────────────────────────────────────

/// The context handed to [`Decorator::around`] for one call through one
/// decoration site.
///
/// Holds the wrapper (this decoration's site, with its per-decoration state
/// and metadata) and the owning instance for the method case. The decorator
/// continues the chain with [`Invocation::proceed`].
pub struct Invocation {
    pub(crate) wrapper: Arc<Wrapper>,
    pub(crate) owner: Option<ViewInstance>,
}

impl Invocation {
    /// This decoration site: the wrapper created when the decorator was
    /// applied to this particular target.
    pub fn decoration(&self) -> &Wrapper {
        &self.wrapper
    }

    /// The owning view instance. `Some` only when the decorated target is a
    /// method reached through a bound entry point; `None` for free functions.
    pub fn owner(&self) -> Option<&ViewInstance> {
        self.owner.as_ref()
    }

    /// Calls the inner callable, threading the owning instance through
    /// unchanged. This is the *only* way inward — a decorator that never
    /// proceeds short-circuits the rest of the chain and the view body.
    pub fn proceed(&self, req: Request) -> BoxFuture {
        self.wrapper.inner().invoke(self.owner.clone(), req)
    }
}

// ── Decorator ────────────────────────────────────────────────────────────────

/// A cross-cutting behavior applicable to free view functions, view methods,
/// and (through the registry) whole view classes.
///
/// Implementations are shared behind `Arc<dyn Decorator>` and must be
/// reentrant: concurrent calls through the same decoration site are the
/// norm, not the exception.
///
/// ```rust
/// use veneer::{BoxFuture, Decorator, Invocation, Request, Response};
/// use http::StatusCode;
///
/// struct RequireHeader(&'static str);
///
/// impl Decorator for RequireHeader {
///     fn name(&self) -> &str { "require_header" }
///
///     fn around(&self, call: Invocation, req: Request) -> BoxFuture {
///         let header = self.0;
///         Box::pin(async move {
///             if req.header(header).is_none() {
///                 return Response::status(StatusCode::BAD_REQUEST);
///             }
///             call.proceed(req).await
///         })
///     }
/// }
/// ```
///
/// Note the `let header = self.0;` before the `async move` block: the
/// returned future must be `'static`, so copy or clone whatever you need out
/// of `self` first.
pub trait Decorator: Send + Sync + 'static {
    /// The decorator's name, used in audit logs and chain introspection.
    fn name(&self) -> &str;

    /// The single fixed entry point, for every target shape.
    ///
    /// The default implementation forwards to the inner callable unchanged —
    /// a decorator that only needs [`on_decoration`](Self::on_decoration)
    /// can leave it alone.
    fn around(&self, call: Invocation, req: Request) -> BoxFuture {
        call.proceed(req)
    }

    /// Called once per decoration site, when the wrapper is constructed.
    ///
    /// The decorator itself is shared across every target it decorates, so
    /// anything site-specific returned here is stored on the wrapper and
    /// read back at call time via [`Invocation::decoration`] and
    /// [`Wrapper::state`].
    fn on_decoration(&self) -> Option<Box<dyn Any + Send + Sync>> {
        None
    }
}

// ── DecoratorFactory ─────────────────────────────────────────────────────────

/// A parameterized decorator: a constructor with a declared arity.
///
/// The factory declares its arity **statically, once** — the arity resolver
/// never reflects over a live call. [`build`](Self::build) receives the
/// captured arguments and produces the shared decorator value.
pub trait DecoratorFactory: Send + Sync + 'static {
    /// The factory's name, used in error messages.
    fn name(&self) -> &str;

    /// The static declared-arity table for this factory's constructor.
    fn arity(&self) -> Arity;

    /// Constructs the decorator from captured arguments. For bare usage the
    /// arguments are empty.
    fn build(&self, args: &CallArgs) -> Result<Arc<dyn Decorator>, Error>;

    /// The single-argument disambiguation hook.
    ///
    /// Consulted only for the genuinely ambiguous call shape: exactly one
    /// positional argument, no keywords, and the argument is itself a
    /// callable or class. The default answer is [`SingleArg::Unresolved`],
    /// which falls back to treating the argument as the decoration target.
    ///
    /// Known limitation of the default: a factory whose one optional
    /// parameter is itself a callable will have that parameter misclassified
    /// as a target. Override this hook, or pass the parameter as a keyword
    /// argument.
    fn classify_single_arg(&self, _arg: &Arg) -> SingleArg {
        SingleArg::Unresolved
    }
}
