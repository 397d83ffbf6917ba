//! Decoration entries and the per-class accumulated chain.

use std::fmt;
use std::sync::Arc;

use crate::decorator::Decorator;
use crate::duplicate::DuplicateSpec;

// ── DecorationEntry ──────────────────────────────────────────────────────────

/// One application of one decorator to one target.
///
/// The decorator itself is shared; the entry records the application: its
/// duplicate-control spec and the application-site id. Position in the chain
/// encodes rank — entries nearer the front are outermore and more recently
/// declared.
#[derive(Clone)]
pub struct DecorationEntry {
    pub(crate) decorator: Arc<dyn Decorator>,
    pub(crate) dup: Option<DuplicateSpec>,
    pub(crate) site: u64,
}

impl DecorationEntry {
    /// The shared decorator applied at this entry.
    pub fn decorator(&self) -> &Arc<dyn Decorator> {
        &self.decorator
    }

    /// The decorator's name.
    pub fn name(&self) -> &str {
        self.decorator.name()
    }

    /// The duplicate group this entry belongs to, if any.
    pub fn duplicate_group(&self) -> Option<&str> {
        self.dup.as_ref().map(|d| d.group.as_str())
    }

    /// Monotonically increasing id of the decoration call that produced this
    /// entry. Entries from one `decorate` call share a site id.
    pub fn site(&self) -> u64 {
        self.site
    }
}

impl fmt::Debug for DecorationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duplicate_group() {
            Some(group) => write!(f, "{}[{group}]", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

// ── AccumulatedChain ─────────────────────────────────────────────────────────

/// The full, hierarchy-merged, ordered list of decoration entries in effect
/// for one class. Outermost entry first.
///
/// Invariants:
/// - entries from a more-derived class precede entries inherited from a
///   less-derived ancestor;
/// - within one decoration call, argument order is outer-to-inner: the
///   decorator written closest to the class applies innermost.
#[derive(Clone, Default)]
pub struct AccumulatedChain {
    pub(crate) entries: Vec<DecorationEntry>,
}

impl AccumulatedChain {
    pub(crate) fn new(entries: Vec<DecorationEntry>) -> Self {
        Self { entries }
    }

    /// The entries, outermost first.
    pub fn entries(&self) -> &[DecorationEntry] {
        &self.entries
    }

    /// Decorator names, outermost first. The shape the audit log events use.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(DecorationEntry::name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DecorationEntry> {
        self.entries.iter()
    }
}

impl fmt::Debug for AccumulatedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}
