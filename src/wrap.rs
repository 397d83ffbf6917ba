//! The wrapper: one decoration site around one callable.
//!
//! A [`Wrapper`] is created fresh for every application of a decorator to a
//! target and is immutable afterwards. It owns the inner callable, carries a
//! copy of the target's introspection metadata (taken at construction, not
//! at call time), and knows which of the two variant kinds it is:
//!
//! - **free** — the target takes only a request; calling the wrapper
//!   directly runs the chain with no owning instance;
//! - **method** — the target expects an owning instance first; the wrapper
//!   must be bound (via [`Bound`] or [`EntryPoint::bind`]) so the instance
//!   threads through the fixed entry point to the inner callable exactly
//!   once.
//!
//! The kind is selected once, at decoration time, from the target's shape —
//! there is no attribute-access-time interception. One `Decorator::around`
//! body therefore works unmodified on a top-level function, on a method, and
//! on a method reached through a chain of base-class delegations.

use std::any::Any;
use std::sync::Arc;

use crate::chain::AccumulatedChain;
use crate::decorator::{Decorator, Invocation};
use crate::request::Request;
use crate::view::{BoxFuture, Callable, Meta, ViewInstance};

// ── Wrapper ──────────────────────────────────────────────────────────────────

/// The two variant kinds, fixed at decoration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapperKind {
    /// Wraps a free view function.
    Free,
    /// Wraps an unbound view method.
    Method,
}

/// One decoration site: a decorator applied around one callable.
pub struct Wrapper {
    decorator: Arc<dyn Decorator>,
    inner: Callable,
    kind: WrapperKind,
    meta: Meta,
    state: Option<Box<dyn Any + Send + Sync>>,
}

impl Wrapper {
    pub(crate) fn new(decorator: Arc<dyn Decorator>, inner: Callable) -> Self {
        let kind = if inner.expects_owner() { WrapperKind::Method } else { WrapperKind::Free };
        // Metadata is copied here, at construction. The wrapper answers
        // introspection with the original target's name, not its own.
        let meta = inner.meta().clone();
        let state = decorator.on_decoration();
        Self { decorator, inner, kind, meta, state }
    }

    /// The shared decorator applied at this site.
    pub fn decorator(&self) -> &Arc<dyn Decorator> {
        &self.decorator
    }

    /// The wrapped callable — a back-reference for introspection. The
    /// wrapper owns it; callers only ever borrow it.
    pub fn wrapped(&self) -> &Callable {
        &self.inner
    }

    pub(crate) fn inner(&self) -> &Callable {
        &self.inner
    }

    /// The variant kind selected at decoration time.
    pub fn kind(&self) -> WrapperKind {
        self.kind
    }

    pub(crate) fn is_method(&self) -> bool {
        self.kind == WrapperKind::Method
    }

    /// The original target's metadata, copied at construction.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Per-decoration state produced by [`Decorator::on_decoration`],
    /// downcast to the decorator's own state type.
    pub fn state<T: 'static>(&self) -> Option<&T> {
        self.state.as_ref().and_then(|s| s.downcast_ref::<T>())
    }

    /// The fixed entry point: hands the decorator an [`Invocation`] holding
    /// this site and the owning instance, and lets it run the chain inward.
    pub(crate) fn invoke(self: &Arc<Self>, owner: Option<ViewInstance>, req: Request) -> BoxFuture {
        let call = Invocation { wrapper: Arc::clone(self), owner };
        self.decorator.around(call, req)
    }
}

impl std::fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Wrapper({} around {})", self.decorator.name(), self.meta.name())
    }
}

// ── Chain application ────────────────────────────────────────────────────────

/// Applies decorators (listed outer-to-inner) around `target`.
///
/// Zero decorators returns `target` itself — the same object, not an
/// equivalent one.
pub(crate) fn apply_decorators(decorators: &[Arc<dyn Decorator>], target: Callable) -> Callable {
    decorators.iter().rev().fold(target, |inner, decorator| {
        Callable::from_wrapper(Wrapper::new(Arc::clone(decorator), inner))
    })
}

/// Applies a resolved accumulated chain (outermost entry first) around
/// `target`.
pub(crate) fn apply_chain(chain: &AccumulatedChain, target: Callable) -> Callable {
    chain.entries().iter().rev().fold(target, |inner, entry| {
        Callable::from_wrapper(Wrapper::new(Arc::clone(entry.decorator()), inner))
    })
}

// ── Bound callables and entry points ─────────────────────────────────────────

/// A callable bound to an owning view instance.
///
/// Created through [`EntryPoint::bind`] or [`Callable::bind`]. Invoking it
/// supplies the instance to the fixed entry point; the chain threads it to
/// the inner method untouched.
pub struct Bound {
    pub(crate) callable: Callable,
    pub(crate) owner: ViewInstance,
}

impl Bound {
    pub fn call(&self, req: Request) -> BoxFuture {
        self.callable.invoke(Some(self.owner.clone()), req)
    }
}

impl Callable {
    /// Binds this callable to an owning instance.
    pub fn bind(&self, owner: ViewInstance) -> Bound {
        Bound { callable: self.clone(), owner }
    }
}

/// The single resolved callable for one method name of one decorated class.
///
/// This is the collaborator contract with the host framework: the framework
/// instantiates the view class, binds the entry point to the instance, and
/// invokes it with the request. veneer does not route.
pub struct EntryPoint {
    pub(crate) class: String,
    pub(crate) method: String,
    pub(crate) callable: Callable,
}

impl EntryPoint {
    /// The owning class's name.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// The method name this entry point resolves.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The fully wrapped callable, chain applied outward-to-inward.
    pub fn callable(&self) -> &Callable {
        &self.callable
    }

    /// Binds the entry point to a view instance.
    pub fn bind(&self, instance: ViewInstance) -> Bound {
        self.callable.bind(instance)
    }

    /// Binds and invokes in one step.
    pub fn invoke(&self, instance: ViewInstance, req: Request) -> BoxFuture {
        self.callable.invoke(Some(instance), req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;

    struct Noop;

    impl Decorator for Noop {
        fn name(&self) -> &str {
            "noop"
        }
    }

    struct Counted;

    impl Decorator for Counted {
        fn name(&self) -> &str {
            "counted"
        }

        fn on_decoration(&self) -> Option<Box<dyn Any + Send + Sync>> {
            Some(Box::new(7u32))
        }
    }

    fn free() -> Callable {
        Callable::function("hello", |_req: Request| async { Response::text("hi") })
            .with_doc("Says hi.")
    }

    fn method() -> Callable {
        Callable::method("dispatch", |_owner: ViewInstance, _req: Request| async {
            Response::text("dispatched")
        })
    }

    #[test]
    fn kind_follows_the_target_shape() {
        let wrapped = apply_decorators(&[Arc::new(Noop)], free());
        assert_eq!(wrapped.as_wrapper().unwrap().kind(), WrapperKind::Free);

        let wrapped = apply_decorators(&[Arc::new(Noop)], method());
        assert_eq!(wrapped.as_wrapper().unwrap().kind(), WrapperKind::Method);
    }

    #[test]
    fn metadata_survives_wrapping() {
        let wrapped = apply_decorators(&[Arc::new(Noop), Arc::new(Noop)], free());
        assert_eq!(wrapped.name(), "hello");
        assert_eq!(wrapped.meta().doc(), Some("Says hi."));
        // The back-reference walks inward one layer at a time.
        let outer = wrapped.as_wrapper().unwrap();
        let inner = outer.wrapped().as_wrapper().unwrap();
        assert_eq!(inner.wrapped().name(), "hello");
        assert!(inner.wrapped().as_wrapper().is_none());
    }

    #[test]
    fn zero_decorators_return_the_identical_object() {
        let target = free();
        let same = apply_decorators(&[], target.clone());
        assert!(same.ptr_eq(&target));
        assert!(same.as_wrapper().is_none());
    }

    #[test]
    fn per_decoration_state_lives_on_the_wrapper() {
        let wrapped = apply_decorators(&[Arc::new(Counted)], free());
        let wrapper = wrapped.as_wrapper().unwrap();
        assert_eq!(wrapper.state::<u32>(), Some(&7));
        assert!(wrapper.state::<String>().is_none());
    }

    #[tokio::test]
    async fn default_around_forwards_to_the_target() {
        let wrapped = apply_decorators(&[Arc::new(Noop)], free());
        let resp = wrapped.call(Request::get("/")).await;
        assert_eq!(resp.body(), b"hi");
    }

    #[tokio::test]
    async fn unbound_method_wrapper_fails_closed() {
        let wrapped = apply_decorators(&[Arc::new(Noop)], method());
        let resp = wrapped.call(Request::get("/")).await;
        assert_eq!(resp.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn bound_method_threads_the_instance() {
        struct State(&'static str);
        let target = Callable::method("dispatch", |owner: ViewInstance, _req: Request| async move {
            let state = owner.downcast::<State>().map(|s| s.0).unwrap_or("missing");
            Response::text(state)
        });
        let wrapped = apply_decorators(&[Arc::new(Noop)], target);
        let instance: ViewInstance = Arc::new(State("real instance"));
        let resp = wrapped.bind(instance).call(Request::get("/")).await;
        assert_eq!(resp.body(), b"real instance");
    }
}
