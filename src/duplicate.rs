//! Duplicate-group resolution.
//!
//! When "logically the same" decorator is applied at several levels of a
//! class hierarchy — an auth check declared on the base *and* re-declared
//! with different parameters on a subclass — applying both is at best
//! wasteful and at worst wrong. Entries tagged with the same duplicate group
//! id are candidates for conflict resolution: of each group, only one member
//! (or a handler-chosen subset) survives into the frozen chain.
//!
//! Resolution policies are a closed set — [`DuplicatePolicy`] — plus one
//! narrow extension point: a pure [`DuplicateHandler`] function. Removed
//! entries are excised entirely; they are never applied and never appear in
//! the post-resolution audit log.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::chain::{AccumulatedChain, DecorationEntry};
use crate::error::Error;

// ── Configuration ────────────────────────────────────────────────────────────

/// The custom per-group extension point.
///
/// Receives the group id and the group's members **oldest first** (least
/// derived, first declared) and returns the members that survive. Surviving
/// entries keep their original chain positions; members not returned are
/// excised. The function must be pure — same input, same output, no side
/// effects — because resolution may run again on every later decoration pass.
pub type DuplicateHandler =
    Arc<dyn Fn(&str, Vec<DecorationEntry>) -> Vec<DecorationEntry> + Send + Sync>;

/// Duplicate-control options for one `decorate` call.
///
/// Applied to every decorator passed in that call, and only to them. All
/// keys except [`group`](Self::group) are meaningless without a group, and
/// supplying one without it is an eager configuration error.
///
/// ```rust
/// use veneer::DuplicateOptions;
///
/// let options = DuplicateOptions::group("auth").priority(1).keep_newest(true);
/// ```
#[derive(Clone, Default)]
pub struct DuplicateOptions {
    group: Option<String>,
    priority: Option<i32>,
    keep_newest: Option<bool>,
    handler: Option<DuplicateHandler>,
}

impl DuplicateOptions {
    /// No duplicate control at all — the default.
    pub fn none() -> Self {
        Self::default()
    }

    /// Tags the call's decorators with a duplicate group id.
    pub fn group(id: impl Into<String>) -> Self {
        Self { group: Some(id.into()), ..Self::default() }
    }

    /// Survival priority within the group. Default 0; strictly higher wins.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Keep the most recently declared member instead of the default oldest.
    pub fn keep_newest(mut self, keep_newest: bool) -> Self {
        self.keep_newest = Some(keep_newest);
        self
    }

    /// Installs a custom resolution handler for the group, overriding the
    /// built-in policies.
    pub fn handler(
        mut self,
        handler: impl Fn(&str, Vec<DecorationEntry>) -> Vec<DecorationEntry> + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Validates and converts to the per-entry spec. `Ok(None)` when no
    /// duplicate control was requested.
    pub(crate) fn to_spec(&self) -> Result<Option<DuplicateSpec>, Error> {
        let Some(group) = &self.group else {
            // Any other key without a group has nothing to resolve within.
            if self.priority.is_some() || self.keep_newest.is_some() || self.handler.is_some() {
                return Err(Error::MissingDuplicateGroup);
            }
            return Ok(None);
        };
        Ok(Some(DuplicateSpec {
            group: group.clone(),
            priority: self.priority.unwrap_or(0),
            keep_newest: self.keep_newest.unwrap_or(false),
            handler: self.handler.clone(),
        }))
    }
}

/// Validated duplicate-control data carried by a [`DecorationEntry`].
#[derive(Clone)]
pub(crate) struct DuplicateSpec {
    pub(crate) group: String,
    pub(crate) priority: i32,
    pub(crate) keep_newest: bool,
    pub(crate) handler: Option<DuplicateHandler>,
}

impl fmt::Debug for DuplicateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplicateSpec")
            .field("group", &self.group)
            .field("priority", &self.priority)
            .field("keep_newest", &self.keep_newest)
            .field("handler", &self.handler.as_ref().map(|_| ".."))
            .finish()
    }
}

// ── Policies ─────────────────────────────────────────────────────────────────

/// The built-in resolution policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Keep the least-derived, first-declared member. The default.
    KeepOldest,
    /// Keep the most-derived, most recently declared member.
    KeepNewest,
    /// Keep the member with the strictly highest priority; recency (or
    /// keep-newest, if any member requests it) breaks priority ties.
    PriorityOrder,
}

/// What one group resolved to use.
enum GroupPolicy {
    Custom(DuplicateHandler),
    Builtin(DuplicatePolicy),
}

/// Picks the policy for one group, `members` newest first.
fn group_policy(group: &str, members: &[&DecorationEntry]) -> Result<GroupPolicy, Error> {
    let mut handler: Option<&DuplicateHandler> = None;
    for entry in members {
        let Some(spec) = &entry.dup else { continue };
        let Some(h) = &spec.handler else { continue };
        match handler {
            None => handler = Some(h),
            // Same Arc shared across members is fine; two distinct handlers
            // for one group cannot both win.
            Some(first) if Arc::ptr_eq(first, h) => {}
            Some(_) => {
                return Err(Error::ConflictingDuplicateHandlers { group: group.to_owned() });
            }
        }
    }
    if let Some(h) = handler {
        return Ok(GroupPolicy::Custom(h.clone()));
    }

    let priorities: Vec<i32> = members.iter().map(|e| priority_of(e)).collect();
    let distinct_priorities = priorities.iter().any(|p| *p != priorities[0]);
    if distinct_priorities {
        return Ok(GroupPolicy::Builtin(DuplicatePolicy::PriorityOrder));
    }
    if members.iter().any(|e| keep_newest_of(e)) {
        return Ok(GroupPolicy::Builtin(DuplicatePolicy::KeepNewest));
    }
    Ok(GroupPolicy::Builtin(DuplicatePolicy::KeepOldest))
}

fn priority_of(entry: &DecorationEntry) -> i32 {
    entry.dup.as_ref().map_or(0, |d| d.priority)
}

fn keep_newest_of(entry: &DecorationEntry) -> bool {
    entry.dup.as_ref().is_some_and(|d| d.keep_newest)
}

// ── Resolution ───────────────────────────────────────────────────────────────

/// Resolves duplicate groups over an accumulated chain.
///
/// A chain with no group of two or more members is returned unchanged — the
/// same entries, same order, no reallocation.
pub(crate) fn resolve(chain: AccumulatedChain) -> Result<AccumulatedChain, Error> {
    // Discover groups in chain order (newest member first within each).
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (index, entry) in chain.entries.iter().enumerate() {
        let Some(group) = entry.duplicate_group() else { continue };
        match groups.iter_mut().find(|(g, _)| g == group) {
            Some((_, members)) => members.push(index),
            None => groups.push((group.to_owned(), vec![index])),
        }
    }

    if groups.iter().all(|(_, members)| members.len() < 2) {
        return Ok(chain);
    }

    let mut removed: HashSet<u64> = HashSet::new();
    for (group, member_indexes) in &groups {
        if member_indexes.len() < 2 {
            continue;
        }
        let members: Vec<&DecorationEntry> =
            member_indexes.iter().map(|&i| &chain.entries[i]).collect();

        match group_policy(group, &members)? {
            GroupPolicy::Custom(handler) => {
                // The handler sees members oldest first and returns survivors.
                let oldest_first: Vec<DecorationEntry> =
                    members.iter().rev().map(|e| (*e).clone()).collect();
                let kept: HashSet<u64> =
                    handler(group, oldest_first).iter().map(|e| e.site).collect();
                for member in &members {
                    if !kept.contains(&member.site) {
                        removed.insert(member.site);
                    }
                }
            }
            GroupPolicy::Builtin(policy) => {
                let survivor = match policy {
                    DuplicatePolicy::KeepNewest => members[0].site,
                    DuplicatePolicy::KeepOldest => members[members.len() - 1].site,
                    DuplicatePolicy::PriorityOrder => {
                        let max = members.iter().map(|e| priority_of(e)).max().unwrap_or(0);
                        let candidates: Vec<&&DecorationEntry> =
                            members.iter().filter(|e| priority_of(e) == max).collect();
                        // Priority picked the candidates; recency breaks ties.
                        if members.iter().any(|e| keep_newest_of(e)) {
                            candidates[0].site
                        } else {
                            candidates[candidates.len() - 1].site
                        }
                    }
                };
                for member in &members {
                    if member.site != survivor {
                        removed.insert(member.site);
                    }
                }
            }
        }
    }

    let entries = chain
        .entries
        .into_iter()
        .filter(|e| !removed.contains(&e.site))
        .collect();
    Ok(AccumulatedChain::new(entries))
}
