//! # veneer
//!
//! Inheritable decorator chains for class-based view handlers.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! The host framework routes, parses, and instantiates. veneer does not — by
//! design. The framework does framework things; veneer controls *whether and
//! in what order* opaque decorators wrap a callable. It never interprets
//! what a decorator means.
//!
//! What the host framework owns — veneer intentionally ignores:
//!
//! - **Routing** — the framework maps paths to entry points
//! - **Wire handling** — requests arrive already parsed
//! - **Instantiation** — the framework constructs view instances
//! - **Decorator semantics** — auth, caching, tracing bodies are opaque
//!
//! What's left for veneer — the part that is genuinely hard to get right:
//!
//! - Bare-vs-parameterized usage, decided from a static declared-arity table
//! - One wrapper mechanism for free functions and methods, instance threaded
//!   through exactly once
//! - Decorator chains accumulated across a class hierarchy without
//!   double-applying inherited entries
//! - Duplicate-group resolution when "the same" decorator reappears at
//!   several hierarchy levels
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use veneer::{
//!     BoxFuture, Callable, ClassDef, Decorator, Invocation, Request, Response,
//!     ViewInstance, ViewRegistry,
//! };
//!
//! struct Logged(&'static str);
//!
//! impl Decorator for Logged {
//!     fn name(&self) -> &str { self.0 }
//!
//!     fn around(&self, call: Invocation, req: Request) -> BoxFuture {
//!         let name = self.0.to_owned();
//!         Box::pin(async move {
//!             tracing::info!(decorator = %name, "entering");
//!             call.proceed(req).await
//!         })
//!     }
//! }
//!
//! # fn main() -> Result<(), veneer::Error> {
//! let mut registry = ViewRegistry::new();
//!
//! let base = registry.register(ClassDef::new("BaseView").method(
//!     "dispatch",
//!     |_this: ViewInstance, _req: Request| async { Response::text("base") },
//! ))?;
//! registry.decorate(base, vec![Arc::new(Logged("base-logged"))])?;
//!
//! let derived = registry.register(ClassDef::new("DerivedView").extends(base))?;
//! registry.decorate(derived, vec![Arc::new(Logged("derived-logged"))])?;
//!
//! // The framework asks for one resolved callable per method name.
//! // DerivedView inherits BaseView's dispatch *and* its decorators;
//! // derived-logged runs first, then base-logged, then the body.
//! let entry = registry.entry_point(derived, "dispatch")?;
//! # Ok(())
//! # }
//! ```
//!
//! Decoration is a load-time activity: build the registry next to the
//! router, decorate everything, then serve. Call time only reads frozen
//! chains.

mod args;
mod chain;
mod decorator;
mod duplicate;
mod error;
mod registry;
mod request;
mod response;
mod usage;
mod view;
mod wrap;

pub use args::{decorate_with_args, Applied, ArgsDecorator, PendingDecoration};
pub use chain::{AccumulatedChain, DecorationEntry};
pub use decorator::{Decorator, DecoratorFactory, Invocation};
pub use duplicate::{DuplicateHandler, DuplicateOptions, DuplicatePolicy};
pub use error::Error;
pub use registry::{ClassDef, ClassId, Decorated, Target, ViewRegistry};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use usage::{resolve_usage, Arg, Arity, CallArgs, ParamValue, SingleArg, Usage};
pub use view::{BoxFuture, Callable, Meta, View, ViewInstance, ViewMethod};
pub use wrap::{Bound, EntryPoint, Wrapper, WrapperKind};
