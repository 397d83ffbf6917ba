//! The parameter-capturing decoration form.
//!
//! [`decorate_with_args`] is the front door for parameterized decorators.
//! It wires a [`DecoratorFactory`] to the arity resolver so one call site
//! handles both usages:
//!
//! - `@factory` — the call's lone argument *is* the target; the factory
//!   builds with no arguments and the decoration completes immediately;
//! - `@factory(...)` — the arguments configure the decorator; a
//!   [`PendingDecoration`] is returned and applied to the target afterwards.

use std::fmt;
use std::sync::Arc;

use crate::decorator::{Decorator, DecoratorFactory};
use crate::duplicate::DuplicateOptions;
use crate::error::Error;
use crate::registry::{Decorated, Target, ViewRegistry};
use crate::usage::{resolve_usage, Arg, CallArgs, Usage};

/// Turns a factory into a usage-resolving decorator front end.
pub fn decorate_with_args(factory: Arc<dyn DecoratorFactory>) -> ArgsDecorator {
    ArgsDecorator { factory, options: DuplicateOptions::none() }
}

/// A factory plus the duplicate-control options scoped to its applications.
pub struct ArgsDecorator {
    factory: Arc<dyn DecoratorFactory>,
    options: DuplicateOptions,
}

impl ArgsDecorator {
    /// Attaches duplicate-control options. They apply to decorators built
    /// through *this* front end, not to decorators from other calls.
    pub fn with_options(mut self, options: DuplicateOptions) -> Self {
        self.options = options;
        self
    }

    /// Feeds the factory call's arguments through the arity resolver.
    ///
    /// Bare usage decorates the lone argument on the spot; parameterized
    /// usage builds the decorator and leaves it [pending](PendingDecoration).
    /// Every error here — arity mismatch, non-decoratable target, ambiguous
    /// usage, bad duplicate options — surfaces now, at decoration time.
    pub fn call(&self, registry: &mut ViewRegistry, args: CallArgs) -> Result<Applied, Error> {
        let classify = |arg: &Arg| self.factory.classify_single_arg(arg);
        let usage = resolve_usage(self.factory.name(), self.factory.arity(), &args, &classify)?;

        match usage {
            Usage::Bare => {
                let decorator = self.factory.build(&CallArgs::empty())?;
                let target = match args.positionals() {
                    [Arg::Callable(callable)] => Target::Callable(callable.clone()),
                    [Arg::Class(id)] => Target::Class(*id),
                    // The resolver only answers `Bare` for a lone
                    // decoratable argument; anything else is a resolver bug
                    // surfaced as the configuration error it would have been.
                    other => {
                        return Err(Error::NotDecoratable {
                            supplied: format!("{} argument(s)", other.len()),
                        });
                    }
                };
                let decorated =
                    registry.decorate_with(target, vec![decorator], self.options.clone())?;
                Ok(Applied::Complete(decorated))
            }
            Usage::Parameterized => {
                let decorator = self.factory.build(&args)?;
                Ok(Applied::Pending(PendingDecoration {
                    decorator,
                    options: self.options.clone(),
                }))
            }
        }
    }
}

/// The outcome of one factory call.
pub enum Applied {
    /// Bare usage: the target is already decorated.
    Complete(Decorated),
    /// Parameterized usage: the decorator is built and waiting for a target.
    Pending(PendingDecoration),
}

impl fmt::Debug for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(_) => f.write_str("Applied::Complete(..)"),
            Self::Pending(_) => f.write_str("Applied::Pending(..)"),
        }
    }
}

impl Applied {
    pub fn into_complete(self) -> Option<Decorated> {
        match self {
            Self::Complete(d) => Some(d),
            Self::Pending(_) => None,
        }
    }

    pub fn into_pending(self) -> Option<PendingDecoration> {
        match self {
            Self::Pending(p) => Some(p),
            Self::Complete(_) => None,
        }
    }
}

/// A built, parameterized decorator waiting for its decoration target.
pub struct PendingDecoration {
    decorator: Arc<dyn Decorator>,
    options: DuplicateOptions,
}

impl PendingDecoration {
    /// The built decorator.
    pub fn decorator(&self) -> &Arc<dyn Decorator> {
        &self.decorator
    }

    /// Applies the decorator to its target. Reusable: the decorator value
    /// is shared, never copied, so one pending decoration can be applied to
    /// many targets.
    pub fn apply(
        &self,
        registry: &mut ViewRegistry,
        target: impl Into<Target>,
    ) -> Result<Decorated, Error> {
        registry.decorate_with(target, vec![Arc::clone(&self.decorator)], self.options.clone())
    }
}
