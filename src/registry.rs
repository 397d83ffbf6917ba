//! The view-class registry: explicit hierarchy, chain accumulation, and the
//! uniform decoration surface.
//!
//! # Why a registry
//!
//! Inheritance of decorations is *resolved*, never discovered. A class's
//! accumulated chain lives in an explicit map keyed by [`ClassId`], built by
//! walking declared bases in registration order — there is no dynamic
//! attribute lookup to fall through, and nothing is recomputed at call time.
//!
//! # The decoration pass
//!
//! Decorating a class is a synchronous, load-time event:
//!
//! 1. build entries for the newly applied decorators (argument order is
//!    outer-to-inner);
//! 2. fetch the previously accumulated chain — the class's own cache if it
//!    was decorated before, else the nearest decorated ancestor's;
//! 3. emit the *before* audit event;
//! 4. run duplicate resolution over the combined chain;
//! 5. emit the *after* audit event;
//! 6. freeze the resolved chain into the class's cache.
//!
//! The two audit events are part of the public contract: tooling (and the
//! tests) assert on them to debug decorator ordering.
//!
//! Accumulation is idempotent per application site — a `decorate` call's
//! entries are folded exactly once, and re-decorating a class builds on its
//! own frozen chain instead of re-walking ancestors. Chains are snapshots: a
//! class decorated *after* its subclass does not retroactively change the
//! subclass's frozen chain.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::chain::{AccumulatedChain, DecorationEntry};
use crate::decorator::Decorator;
use crate::duplicate::{self, DuplicateOptions};
use crate::error::Error;
use crate::view::{BoxedMethod, Callable, ViewMethod};
use crate::wrap::{apply_chain, apply_decorators, EntryPoint};

// ── Class identity and definitions ───────────────────────────────────────────

/// Identity of a registered view class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClassId(pub(crate) usize);

/// A view-class definition: a name, an optional declared base, and named
/// unbound methods.
///
/// ```rust
/// use veneer::{ClassDef, Request, Response, ViewInstance};
///
/// let def = ClassDef::new("ProfileView").method(
///     "dispatch",
///     |_this: ViewInstance, _req: Request| async { Response::text("profile") },
/// );
/// ```
pub struct ClassDef {
    name: String,
    base: Option<ClassId>,
    methods: Vec<(String, BoxedMethod)>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), base: None, methods: Vec::new() }
    }

    /// Declares the base class. Bases must be registered first, which gives
    /// the registry a deterministic topological order for free.
    pub fn extends(mut self, base: ClassId) -> Self {
        self.base = Some(base);
        self
    }

    /// Defines a named method. A definition here overrides the same name
    /// anywhere up the declared-base walk.
    pub fn method(mut self, name: impl Into<String>, method: impl ViewMethod) -> Self {
        self.methods.push((name.into(), method.into_boxed_method()));
        self
    }
}

struct ClassRecord {
    name: String,
    base: Option<ClassId>,
    methods: HashMap<String, BoxedMethod>,
    /// The frozen, duplicate-resolved chain. `None` until the class itself
    /// is decorated.
    chain: Option<AccumulatedChain>,
}

// ── Decoration targets ───────────────────────────────────────────────────────

/// What a decoration call is aimed at.
pub enum Target {
    /// A free view function or an unbound method.
    Callable(Callable),
    /// A registered view class.
    Class(ClassId),
}

impl From<Callable> for Target {
    fn from(c: Callable) -> Self { Self::Callable(c) }
}

impl From<ClassId> for Target {
    fn from(id: ClassId) -> Self { Self::Class(id) }
}

/// The result of a decoration call, mirroring the target's shape.
pub enum Decorated {
    /// The (possibly wrapped) callable.
    Callable(Callable),
    /// The decorated class.
    Class(ClassId),
}

impl fmt::Debug for Decorated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Decorated::Callable(..)"),
            Self::Class(id) => f.debug_tuple("Decorated::Class").field(id).finish(),
        }
    }
}

impl Decorated {
    pub fn into_callable(self) -> Option<Callable> {
        match self {
            Self::Callable(c) => Some(c),
            Self::Class(_) => None,
        }
    }

    pub fn into_class(self) -> Option<ClassId> {
        match self {
            Self::Class(id) => Some(id),
            Self::Callable(_) => None,
        }
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// The registry of view classes and their accumulated decorator chains.
///
/// One registry per application, built at start-up next to the router. All
/// mutation happens during this load-time phase; request handling only reads
/// resolved entry points.
#[derive(Default)]
pub struct ViewRegistry {
    classes: Vec<ClassRecord>,
    sites: u64,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class. Declared bases must already be registered.
    pub fn register(&mut self, def: ClassDef) -> Result<ClassId, Error> {
        if let Some(base) = def.base {
            self.record(base)?;
        }
        let mut methods = HashMap::new();
        for (name, method) in def.methods {
            if methods.insert(name.clone(), method).is_some() {
                return Err(Error::MethodRedefined { class: def.name, method: name });
            }
        }
        self.classes.push(ClassRecord {
            name: def.name,
            base: def.base,
            methods,
            chain: None,
        });
        Ok(ClassId(self.classes.len() - 1))
    }

    /// The registered name of a class.
    pub fn class_name(&self, id: ClassId) -> Result<&str, Error> {
        Ok(&self.record(id)?.name)
    }

    /// Decorates a target with no duplicate control.
    pub fn decorate(
        &mut self,
        target: impl Into<Target>,
        decorators: Vec<Arc<dyn Decorator>>,
    ) -> Result<Decorated, Error> {
        self.decorate_with(target, decorators, DuplicateOptions::none())
    }

    /// Decorates a target. `options` apply to every decorator passed in this
    /// call — and only to them.
    ///
    /// Decorator order is outer-to-inner: the first decorator in the list
    /// runs first on the way in, and the last sits closest to the target.
    /// Zero decorators return the target unchanged — the identical object,
    /// with no decoration pass and no audit events.
    pub fn decorate_with(
        &mut self,
        target: impl Into<Target>,
        decorators: Vec<Arc<dyn Decorator>>,
        options: DuplicateOptions,
    ) -> Result<Decorated, Error> {
        // Eager validation, before anything is wrapped or accumulated.
        let dup = options.to_spec()?;

        match target.into() {
            Target::Callable(callable) => {
                if decorators.is_empty() {
                    return Ok(Decorated::Callable(callable));
                }
                Ok(Decorated::Callable(apply_decorators(&decorators, callable)))
            }
            Target::Class(id) => {
                self.record(id)?;
                if decorators.is_empty() {
                    return Ok(Decorated::Class(id));
                }

                let new_entries: Vec<DecorationEntry> = decorators
                    .iter()
                    .map(|decorator| DecorationEntry {
                        decorator: Arc::clone(decorator),
                        dup: dup.clone(),
                        site: self.next_site(),
                    })
                    .collect();

                // The class's own frozen chain already folds in everything
                // from previous passes (its ancestors included), so it takes
                // precedence over a fresh ancestor walk.
                let prior = match &self.record(id)?.chain {
                    Some(own) => own.clone(),
                    None => self.nearest_ancestor_chain(id).unwrap_or_default(),
                };

                let class_name = self.record(id)?.name.clone();
                let new_names: Vec<String> = new_entries
                    .iter()
                    .map(|entry| entry.name().to_owned())
                    .collect();
                debug!(
                    class = %class_name,
                    decorators = ?new_names,
                    accumulated = ?prior,
                    "before decorating class"
                );

                let mut entries = new_entries;
                entries.extend(prior.entries().iter().cloned());
                let resolved = duplicate::resolve(AccumulatedChain::new(entries))?;

                debug!(
                    class = %class_name,
                    decorators = ?new_names,
                    resolved = ?resolved,
                    "after decorating class"
                );

                self.classes[id.0].chain = Some(resolved);
                Ok(Decorated::Class(id))
            }
        }
    }

    /// The frozen, duplicate-resolved chain cached on a class, if the class
    /// itself has been decorated.
    pub fn resolved_chain(&self, id: ClassId) -> Option<&AccumulatedChain> {
        self.classes.get(id.0).and_then(|r| r.chain.as_ref())
    }

    /// The single resolved entry point for one method name: the most-derived
    /// method definition, wrapped in the class's effective chain
    /// outward-to-inward.
    ///
    /// Method resolution happens here, against the real class — so a method
    /// body that delegates to a captured base implementation still runs with
    /// the instance the framework constructed.
    pub fn entry_point(&self, id: ClassId, method: &str) -> Result<EntryPoint, Error> {
        let record = self.record(id)?;
        let (defined_in, boxed) = self.resolve_method(id, method)?;
        let target = Callable::from_boxed_method(
            format!("{}.{}", self.record(defined_in)?.name, method),
            boxed,
        );
        // A never-decorated class still inherits the nearest decorated
        // ancestor's chain, exactly as it inherits the method body.
        let callable = match self.effective_chain(id) {
            Some(chain) => apply_chain(chain, target),
            None => target,
        };
        Ok(EntryPoint {
            class: record.name.clone(),
            method: method.to_owned(),
            callable,
        })
    }

    /// The raw resolved method for one name — no decorator chain applied.
    ///
    /// This is how a derived method body captures its base implementation
    /// for explicit delegation:
    ///
    /// ```rust
    /// # use veneer::{ClassDef, Request, Response, ViewInstance, ViewRegistry};
    /// # fn main() -> Result<(), veneer::Error> {
    /// # let mut registry = ViewRegistry::new();
    /// # let base = registry.register(ClassDef::new("BaseView").method(
    /// #     "dispatch",
    /// #     |_this: ViewInstance, _req: Request| async { Response::text("base") },
    /// # ))?;
    /// let base_dispatch = registry.unbound_method(base, "dispatch")?;
    /// let derived = registry.register(ClassDef::new("DerivedView").extends(base).method(
    ///     "dispatch",
    ///     move |this: ViewInstance, req: Request| {
    ///         let base_dispatch = base_dispatch.clone();
    ///         async move { base_dispatch.invoke(Some(this), req).await }
    ///     },
    /// ))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn unbound_method(&self, id: ClassId, method: &str) -> Result<Callable, Error> {
        let (defined_in, boxed) = self.resolve_method(id, method)?;
        Ok(Callable::from_boxed_method(
            format!("{}.{}", self.record(defined_in)?.name, method),
            boxed,
        ))
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn record(&self, id: ClassId) -> Result<&ClassRecord, Error> {
        self.classes.get(id.0).ok_or(Error::UnknownClass(id))
    }

    fn next_site(&mut self) -> u64 {
        self.sites += 1;
        self.sites
    }

    /// Walks declared bases from `id` (exclusive) and returns the first
    /// cached chain found, skipping never-decorated ancestors.
    fn nearest_ancestor_chain(&self, id: ClassId) -> Option<AccumulatedChain> {
        let mut cursor = self.classes.get(id.0)?.base;
        while let Some(base) = cursor {
            let record = self.classes.get(base.0)?;
            if let Some(chain) = &record.chain {
                return Some(chain.clone());
            }
            cursor = record.base;
        }
        None
    }

    /// The chain in effect for `id`: its own cache, else the nearest
    /// decorated ancestor's.
    fn effective_chain(&self, id: ClassId) -> Option<&AccumulatedChain> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let record = self.classes.get(current.0)?;
            if let Some(chain) = &record.chain {
                return Some(chain);
            }
            cursor = record.base;
        }
        None
    }

    /// Most-derived method resolution along the declared-base walk.
    fn resolve_method(&self, id: ClassId, method: &str) -> Result<(ClassId, BoxedMethod), Error> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let record = self.record(current)?;
            if let Some(boxed) = record.methods.get(method) {
                return Ok((current, Arc::clone(boxed)));
            }
            cursor = record.base;
        }
        Err(Error::UnknownMethod {
            class: self.record(id)?.name.clone(),
            method: method.to_owned(),
        })
    }
}
