//! Cross-target reload coordination
//!
//! Several independently compiled targets can share one host page, and the
//! page can only reload once. The registry is the one piece of state shared
//! across otherwise-isolated per-target runtimes: a map from target name to
//! that target's current reload verdict.
//!
//! Lifecycle: [`register`](ReloadRegistry::register) when a target's
//! runtime starts (verdict `MightWantToReload`, undecided),
//! [`set`](ReloadRegistry::set) on every model change (each runtime writes
//! only its own key, so last-write-wins per key is sufficient), and
//! [`deregister`](ReloadRegistry::deregister) when the runtime ends.
//!
//! The coordinator check ([`check`](ReloadRegistry::check)) runs whenever
//! any target settles or requests a reload: the page may reload only when
//! **no** target is still `MightWantToReload`. The read, the decision, and
//! the clearing of the consumed requests all happen under a single lock
//! acquisition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One target's current opinion about reloading the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadVerdict {
    /// Undecided, e.g. still connecting or compiling. Blocks any reload.
    MightWantToReload,
    /// Settled and content with the running code
    NoReloadWanted,
    /// New code needs a full reload; carries human-readable reasons
    ReloadRequested { reasons: Vec<String> },
}

/// The decision produced by a successful coordinator check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadDecision {
    /// Reasons from every requesting target, in registration order
    pub reasons: Vec<String>,
}

/// Shared reload-verdict map; cheap to clone, all clones share state
#[derive(Debug, Clone, Default)]
pub struct ReloadRegistry {
    inner: Arc<Mutex<HashMap<String, ReloadVerdict>>>,
}

impl ReloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a target's entry; called when its runtime starts
    pub fn register(&self, target: &str) {
        self.lock()
            .insert(target.to_string(), ReloadVerdict::MightWantToReload);
    }

    /// Remove a target's entry; called when its runtime ends
    pub fn deregister(&self, target: &str) {
        self.lock().remove(target);
    }

    /// Record a target's verdict (each runtime writes only its own key)
    pub fn set(&self, target: &str, verdict: ReloadVerdict) {
        self.lock().insert(target.to_string(), verdict);
    }

    pub fn verdict(&self, target: &str) -> Option<ReloadVerdict> {
        self.lock().get(target).cloned()
    }

    /// The coordinator check: decide whether the page may reload now.
    ///
    /// Returns `None` while any target is undecided or no target has
    /// requested a reload. On `Some`, the consumed requests are reset to
    /// `MightWantToReload` under the same lock (read-then-clear), so a
    /// second check cannot double-trigger on the same requests.
    pub fn check(&self) -> Option<ReloadDecision> {
        let mut verdicts = self.lock();

        if verdicts
            .values()
            .any(|verdict| *verdict == ReloadVerdict::MightWantToReload)
        {
            return None;
        }

        let mut requesting: Vec<String> = verdicts
            .iter()
            .filter(|(_, verdict)| matches!(verdict, ReloadVerdict::ReloadRequested { .. }))
            .map(|(target, _)| target.clone())
            .collect();
        if requesting.is_empty() {
            return None;
        }
        requesting.sort();

        let mut reasons = Vec::new();
        for target in requesting {
            if let Some(ReloadVerdict::ReloadRequested {
                reasons: target_reasons,
            }) = verdicts.insert(target, ReloadVerdict::MightWantToReload)
            {
                reasons.extend(target_reasons);
            }
        }

        Some(ReloadDecision { reasons })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ReloadVerdict>> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested(reasons: &[&str]) -> ReloadVerdict {
        ReloadVerdict::ReloadRequested {
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_register_starts_undecided() {
        let registry = ReloadRegistry::new();
        registry.register("app");
        assert_eq!(
            registry.verdict("app"),
            Some(ReloadVerdict::MightWantToReload)
        );
    }

    #[test]
    fn test_undecided_target_blocks_reload() {
        let registry = ReloadRegistry::new();
        registry.register("undecided");
        registry.register("wants-reload");
        registry.set("wants-reload", requested(&["new code"]));

        // One target might still want to reload on its own; wait for it.
        assert_eq!(registry.check(), None);

        // Once it settles, the pending request goes through.
        registry.set("undecided", ReloadVerdict::NoReloadWanted);
        let decision = registry.check().expect("reload should be decided");
        assert_eq!(decision.reasons, vec!["new code".to_string()]);
    }

    #[test]
    fn test_no_requests_means_no_reload() {
        let registry = ReloadRegistry::new();
        registry.register("a");
        registry.set("a", ReloadVerdict::NoReloadWanted);
        assert_eq!(registry.check(), None);
    }

    #[test]
    fn test_check_clears_consumed_requests() {
        let registry = ReloadRegistry::new();
        registry.register("a");
        registry.set("a", requested(&["reason"]));

        assert!(registry.check().is_some());
        // The request was consumed; a second check has nothing to do.
        assert_eq!(registry.check(), None);
        assert_eq!(registry.verdict("a"), Some(ReloadVerdict::MightWantToReload));
    }

    #[test]
    fn test_reasons_from_all_requesting_targets_are_collected() {
        let registry = ReloadRegistry::new();
        registry.register("a");
        registry.register("b");
        registry.set("a", requested(&["reason a"]));
        registry.set("b", requested(&["reason b"]));

        let decision = registry.check().expect("reload should be decided");
        assert_eq!(
            decision.reasons,
            vec!["reason a".to_string(), "reason b".to_string()]
        );
    }

    #[test]
    fn test_deregister_removes_entry() {
        let registry = ReloadRegistry::new();
        registry.register("a");
        registry.deregister("a");
        assert_eq!(registry.verdict("a"), None);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = ReloadRegistry::new();
        let clone = registry.clone();
        registry.register("a");
        assert_eq!(clone.verdict("a"), Some(ReloadVerdict::MightWantToReload));
    }
}
