//! View callables and type erasure.
//!
//! # How views are stored
//!
//! A decorator chain must hold callables of *different* concrete types behind
//! one interface: a plain `async fn`, a method closure capturing its class,
//! or another wrapper. Rust collections and fields can only hold one concrete
//! type, so we use **trait objects** to hide the concrete type behind a
//! common interface and store everything uniformly.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn profile(req: Request) -> Response { … }   ← user writes this
//!        ↓ Callable::function("profile", profile)
//! Arc::new(FnView(profile))                          ← heap-allocated wrapper
//!        ↓  stored as BoxedView = Arc<dyn ErasedView>
//! callable.invoke(owner, req)  at call time          ← one vtable dispatch
//!        ↓
//! Box::pin(async { profile(req).await.into_response() })  ← BoxFuture
//! ```
//!
//! Unbound methods get the same treatment with one extra argument: the
//! owning [`ViewInstance`], threaded through the chain exactly once.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;
use tracing::error;

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::wrap::Wrapper;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Pin<Box<…>>` is required because the async runtime must be able to poll
/// the future in-place — it cannot move it in memory after the first poll.
/// `Send + 'static` let the runtime move the future across threads safely.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// An instance of a view class, opaque to veneer.
///
/// The host framework instantiates view classes; veneer only threads the
/// instance through to method bodies, which downcast it back to their own
/// state type.
pub type ViewInstance = Arc<dyn Any + Send + Sync>;

/// Internal dispatch interface for free view functions.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `View` trait's `into_boxed_view` method.
/// External crates cannot usefully interact with this trait.
#[doc(hidden)]
pub trait ErasedView {
    fn call(&self, req: Request) -> BoxFuture;
}

/// Internal dispatch interface for unbound view methods.
#[doc(hidden)]
pub trait ErasedMethod {
    fn call(&self, owner: ViewInstance, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased view function shared across call sites.
#[doc(hidden)]
pub type BoxedView = Arc<dyn ErasedView + Send + Sync + 'static>;

/// A heap-allocated, type-erased unbound method shared across call sites.
#[doc(hidden)]
pub type BoxedMethod = Arc<dyn ErasedMethod + Send + Sync + 'static>;

// ── Public View / ViewMethod traits ───────────────────────────────────────────

/// Implemented for every valid free view function.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it.
pub trait View: private::SealedView + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_view(self) -> BoxedView;
}

/// Implemented for every valid unbound view method: an `async` closure or fn
/// taking the owning [`ViewInstance`] first, then the request.
///
/// ```text
/// async fn dispatch(this: ViewInstance, req: Request) -> impl IntoResponse
/// ```
///
/// Sealed, like [`View`].
pub trait ViewMethod: private::SealedMethod + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_method(self) -> BoxedMethod;
}

/// The sealing module. Because the traits here are private, external crates
/// cannot name them and therefore cannot implement `View` / `ViewMethod` on
/// their own types.
mod private {
    pub trait SealedView {}
    pub trait SealedMethod {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::SealedView for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> View for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_view(self) -> BoxedView {
        Arc::new(FnView(self))
    }
}

impl<F, Fut, R> private::SealedMethod for F
where
    F: Fn(ViewInstance, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> ViewMethod for F
where
    F: Fn(ViewInstance, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_method(self) -> BoxedMethod {
        Arc::new(FnMethod(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

/// Newtype wrapper bridging a concrete view function to the trait-object world.
struct FnView<F>(F);

impl<F, Fut, R> ErasedView for FnView<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        // Call the wrapped function first — the returned future owns its
        // captures and does not borrow `self`.
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Newtype wrapper bridging a concrete unbound method to the trait-object world.
struct FnMethod<F>(F);

impl<F, Fut, R> ErasedMethod for FnMethod<F>
where
    F: Fn(ViewInstance, Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, owner: ViewInstance, req: Request) -> BoxFuture {
        let fut = (self.0)(owner, req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Metadata ─────────────────────────────────────────────────────────────────

/// Introspection metadata carried by every callable and copied — never moved —
/// onto each wrapper at construction time.
///
/// Rust has no runtime docstrings, so `doc` is whatever the registrant chose
/// to attach; `name` is the function or `Class.method` name.
#[derive(Clone, Debug)]
pub struct Meta {
    pub(crate) name: String,
    pub(crate) doc: Option<String>,
}

impl Meta {
    pub fn name(&self) -> &str { &self.name }
    pub fn doc(&self) -> Option<&str> { self.doc.as_deref() }
}

// ── Callable ─────────────────────────────────────────────────────────────────

/// The concrete shape of a [`Callable`].
#[derive(Clone)]
pub(crate) enum CallKind {
    Function(BoxedView),
    Method(BoxedMethod),
    Wrapped(Arc<Wrapper>),
}

/// A decoratable, invokable unit: a free view function, an unbound view
/// method, or an already-wrapped chain of either.
///
/// Cloning a `Callable` clones `Arc` handles, never the underlying closure —
/// the same decorated object is shared by identity, which is what the
/// zero-decorator guarantee ([`Callable::ptr_eq`]) is measured against.
#[derive(Clone)]
pub struct Callable {
    pub(crate) kind: CallKind,
    pub(crate) meta: Meta,
}

impl Callable {
    /// Wraps a free view function.
    pub fn function(name: impl Into<String>, view: impl View) -> Self {
        Self {
            kind: CallKind::Function(view.into_boxed_view()),
            meta: Meta { name: name.into(), doc: None },
        }
    }

    /// Wraps an unbound view method.
    pub fn method(name: impl Into<String>, method: impl ViewMethod) -> Self {
        Self {
            kind: CallKind::Method(method.into_boxed_method()),
            meta: Meta { name: name.into(), doc: None },
        }
    }

    pub(crate) fn from_boxed_method(name: impl Into<String>, method: BoxedMethod) -> Self {
        Self {
            kind: CallKind::Method(method),
            meta: Meta { name: name.into(), doc: None },
        }
    }

    pub(crate) fn from_wrapper(wrapper: Wrapper) -> Self {
        let meta = wrapper.meta().clone();
        Self { kind: CallKind::Wrapped(Arc::new(wrapper)), meta }
    }

    /// Attaches a documentation string to the metadata.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.meta.doc = Some(doc.into());
        self
    }

    /// Introspection metadata: the original target's name survives every
    /// layer of wrapping.
    pub fn meta(&self) -> &Meta { &self.meta }

    /// The callable's name.
    pub fn name(&self) -> &str { &self.meta.name }

    /// The outermost [`Wrapper`], if this callable has been decorated.
    pub fn as_wrapper(&self) -> Option<&Wrapper> {
        match &self.kind {
            CallKind::Wrapped(w) => Some(w),
            _ => None,
        }
    }

    /// `true` if the target expects an owning instance (method shape).
    pub fn expects_owner(&self) -> bool {
        match &self.kind {
            CallKind::Function(_) => false,
            CallKind::Method(_) => true,
            CallKind::Wrapped(w) => w.is_method(),
        }
    }

    /// `true` if both callables are the *same object*, not merely equivalent.
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        match (&self.kind, &other.kind) {
            (CallKind::Function(a), CallKind::Function(b)) => Arc::ptr_eq(a, b),
            (CallKind::Method(a), CallKind::Method(b)) => Arc::ptr_eq(a, b),
            (CallKind::Wrapped(a), CallKind::Wrapped(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Invokes the callable with an optional owning instance.
    ///
    /// Free functions ignore `owner`; methods require it. Invoking a method
    /// without an owner is an internal dispatch failure and is handled the
    /// way dispatch failures are handled everywhere in veneer: a `500` and an
    /// error log, never a panic.
    pub fn invoke(&self, owner: Option<ViewInstance>, req: Request) -> BoxFuture {
        match &self.kind {
            CallKind::Function(view) => view.call(req),
            CallKind::Method(method) => match owner {
                Some(owner) => method.call(owner, req),
                None => {
                    error!(method = %self.meta.name, "unbound method invoked without an instance");
                    Box::pin(async { Response::status(StatusCode::INTERNAL_SERVER_ERROR) })
                }
            },
            CallKind::Wrapped(wrapper) => wrapper.invoke(owner, req),
        }
    }

    /// Free-function convenience: invoke with no owning instance.
    pub fn call(&self, req: Request) -> BoxFuture {
        self.invoke(None, req)
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            CallKind::Function(_) => "function",
            CallKind::Method(_) => "method",
            CallKind::Wrapped(_) => "wrapped",
        };
        write!(f, "Callable({kind} {})", self.meta.name)
    }
}
