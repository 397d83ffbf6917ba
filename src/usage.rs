//! Bare-vs-parameterized usage resolution.
//!
//! A decorator factory can be used two ways:
//!
//! - **bare** — applied straight to a target, no argument list;
//! - **parameterized** — called with constructor arguments first, the target
//!   supplied afterwards.
//!
//! Whether a given call is one or the other is decided here, from the
//! factory's **static declared arity** and the *shape* of the call arguments
//! — never their values, never runtime reflection. The decision is one pure
//! function, [`resolve_usage`], deterministic and side-effect-free.
//!
//! The one genuinely ambiguous shape — exactly one positional argument, no
//! keywords, and the argument is itself a callable or class — goes to the
//! factory's single-argument hook
//! ([`DecoratorFactory::classify_single_arg`](crate::DecoratorFactory::classify_single_arg)).
//! When the hook does not resolve it, the default treats the argument as the
//! decoration target.

use std::fmt;

use crate::error::Error;
use crate::registry::ClassId;
use crate::view::Callable;

// ── Arity ────────────────────────────────────────────────────────────────────

/// A factory constructor's declared arity, built once at registration time.
#[derive(Clone, Copy, Debug)]
pub struct Arity {
    /// Mandatory parameter count.
    pub required: usize,
    /// Optional parameter count.
    pub optional: usize,
    /// Author opt-in: even with zero required parameters, the factory must
    /// be *called* (possibly with no arguments) before receiving its target.
    pub parens_required: bool,
}

impl Arity {
    /// A factory taking no parameters at all. Usage is always bare.
    pub fn none() -> Self {
        Self { required: 0, optional: 0, parens_required: false }
    }

    /// A factory with only optional parameters.
    pub fn optional(optional: usize) -> Self {
        Self { required: 0, optional, parens_required: false }
    }

    /// A factory with mandatory parameters. Parameterized usage is forced.
    pub fn required(required: usize, optional: usize) -> Self {
        Self { required, optional, parens_required: false }
    }

    /// Forces the parameterized form even for a zero-argument call.
    pub fn with_parens_required(mut self) -> Self {
        self.parens_required = true;
        self
    }
}

// ── Call arguments ───────────────────────────────────────────────────────────

/// A plain parameter value passed to a decorator factory.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self { Self::Str(v.to_owned()) }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self { Self::Str(v) }
}

/// One argument in a factory call: either something decoratable (a callable
/// or a registered class) or a plain parameter value.
#[derive(Clone, Debug)]
pub enum Arg {
    /// A free function or unbound method.
    Callable(Callable),
    /// A registered view class.
    Class(ClassId),
    /// A plain parameter value.
    Value(ParamValue),
}

impl Arg {
    /// `true` if this argument is routine- or class-shaped — i.e. something
    /// a decorator could be applied to.
    pub fn is_decoratable(&self) -> bool {
        matches!(self, Self::Callable(_) | Self::Class(_))
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Callable(c) => format!("callable `{}`", c.name()),
            Self::Class(id) => format!("class {id:?}"),
            Self::Value(v) => format!("value {v:?}"),
        }
    }
}

/// The arguments of one factory call: positional and keyword.
#[derive(Clone, Debug, Default)]
pub struct CallArgs {
    positional: Vec<Arg>,
    keyword: Vec<(String, Arg)>,
}

impl CallArgs {
    /// An empty argument list — the `@factory()` form.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn positional(mut self, arg: impl Into<Arg>) -> Self {
        self.positional.push(arg.into());
        self
    }

    /// Appends a keyword argument. A keyword argument is never mistaken for
    /// a decoration target, which makes it the standard workaround for the
    /// single-callable-parameter ambiguity.
    pub fn keyword(mut self, name: impl Into<String>, arg: impl Into<Arg>) -> Self {
        self.keyword.push((name.into(), arg.into()));
        self
    }

    pub fn positionals(&self) -> &[Arg] { &self.positional }
    pub fn keywords(&self) -> &[(String, Arg)] { &self.keyword }

    /// Total argument count, positional plus keyword.
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Keyword lookup.
    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.keyword.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

impl From<ParamValue> for Arg {
    fn from(v: ParamValue) -> Self { Arg::Value(v) }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self { Arg::Value(v.into()) }
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self { Arg::Value(v.into()) }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self { Arg::Value(v.into()) }
}

impl From<String> for Arg {
    fn from(v: String) -> Self { Arg::Value(v.into()) }
}

impl From<Callable> for Arg {
    fn from(c: Callable) -> Self { Arg::Callable(c) }
}

impl From<ClassId> for Arg {
    fn from(id: ClassId) -> Self { Arg::Class(id) }
}

// ── Usage resolution ─────────────────────────────────────────────────────────

/// The resolver's verdict on one factory call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Usage {
    /// The lone argument is the decoration target; the factory's constructor
    /// runs with no arguments.
    Bare,
    /// The arguments configure the decorator; the target comes later.
    Parameterized,
}

/// A factory's answer for the ambiguous single-argument shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SingleArg {
    /// The argument is the decoration target (bare usage).
    Target,
    /// The argument is a constructor parameter (parameterized usage).
    Parameter,
    /// The factory cannot tell; fall back to the default policy.
    Unresolved,
}

/// Decides whether `call` is bare or parameterized usage of a factory with
/// the given declared `arity`.
///
/// `classify` is the factory's single-argument hook; it is consulted only
/// for the one ambiguous shape described in the module docs.
pub fn resolve_usage(
    decorator: &str,
    arity: Arity,
    call: &CallArgs,
    classify: &dyn Fn(&Arg) -> SingleArg,
) -> Result<Usage, Error> {
    let supplied = call.len();
    let mismatch = || Error::ArityMismatch {
        decorator: decorator.to_owned(),
        required: arity.required,
        optional: arity.optional,
        supplied,
    };

    // No parameters at all: the factory is always used bare, so the call
    // must carry exactly the target.
    if arity.required == 0 && arity.optional == 0 && !arity.parens_required {
        return match (call.positionals(), call.keywords()) {
            ([arg], []) if arg.is_decoratable() => Ok(Usage::Bare),
            ([arg], []) => Err(Error::NotDecoratable { supplied: arg.describe() }),
            _ => Err(mismatch()),
        };
    }

    // Mandatory parameters force the parameterized form.
    if arity.required > 0 {
        if supplied < arity.required || supplied > arity.required + arity.optional {
            return Err(mismatch());
        }
        return Ok(Usage::Parameterized);
    }

    // Optional-only (or parens forced): anything but a lone decoratable
    // positional argument is unambiguous.
    let lone = match (call.positionals(), call.keywords()) {
        ([arg], []) if arg.is_decoratable() => arg,
        _ => {
            return if supplied > arity.optional { Err(mismatch()) } else { Ok(Usage::Parameterized) };
        }
    };

    match classify(lone) {
        SingleArg::Target if arity.parens_required => {
            // The author both forced parentheses and classified the argument
            // as a bare target. There is no call shape that satisfies both.
            Err(Error::AmbiguousUsage { decorator: decorator.to_owned() })
        }
        SingleArg::Target => Ok(Usage::Bare),
        SingleArg::Parameter if arity.optional == 0 => {
            // Classified as a parameter, but the constructor has no capacity.
            Err(Error::AmbiguousUsage { decorator: decorator.to_owned() })
        }
        SingleArg::Parameter => Ok(Usage::Parameterized),
        // Default policy: prefer the bare form. Documented limitation: a
        // factory whose one optional parameter is itself a callable gets
        // that parameter misclassified as a target here.
        SingleArg::Unresolved if !arity.parens_required => Ok(Usage::Bare),
        SingleArg::Unresolved if arity.optional >= 1 => Ok(Usage::Parameterized),
        SingleArg::Unresolved => Err(mismatch()),
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare => f.write_str("bare"),
            Self::Parameterized => f.write_str("parameterized"),
        }
    }
}
