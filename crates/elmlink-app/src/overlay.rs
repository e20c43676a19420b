//! Compile-error overlay state
//!
//! The overlay shows every error the server reported. Entries are keyed by
//! a content hash so that the same error reported again (or reported by a
//! second target sharing the page) maps onto the existing entry and keeps
//! its expanded/collapsed UI state, instead of collapsing everything on
//! every recompile.

use sha2::{Digest, Sha256};

use elmlink_core::types::{CompileErrorReport, ErrorColors};

/// One displayed error
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayEntry {
    /// Content hash of report + colors; stable across re-reports
    pub key: String,
    pub report: CompileErrorReport,
    pub colors: ErrorColors,
    /// Whether the user has expanded this entry
    pub expanded: bool,
}

/// The merged set of currently displayed compile errors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorOverlay {
    /// Whether the overlay as a whole is open
    pub open: bool,
    pub entries: Vec<OverlayEntry>,
}

impl ErrorOverlay {
    /// Build a fresh overlay from server reports, in arrival order
    pub fn from_reports(reports: &[CompileErrorReport], colors: &ErrorColors) -> Self {
        ErrorOverlay::default().merged_with(reports, colors)
    }

    /// Merge a new batch of reports into this overlay.
    ///
    /// Entries whose key matches an incoming report are kept as-is
    /// (preserving their expanded state), unmatched old entries are
    /// dropped, and new entries are inserted preserving arrival order.
    pub fn merged_with(&self, reports: &[CompileErrorReport], colors: &ErrorColors) -> Self {
        let entries = reports
            .iter()
            .map(|report| {
                let key = entry_key(report, colors);
                match self.entries.iter().find(|entry| entry.key == key) {
                    Some(existing) => existing.clone(),
                    None => OverlayEntry {
                        key,
                        report: report.clone(),
                        colors: colors.clone(),
                        expanded: false,
                    },
                }
            })
            .collect();
        ErrorOverlay {
            open: self.open,
            entries,
        }
    }

    /// Set the expanded state of one entry, by key
    pub fn set_expanded(&mut self, key: &str, expanded: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.key == key) {
            entry.expanded = expanded;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Content hash of `{title, location, html_content, colors}`
fn entry_key(report: &CompileErrorReport, colors: &ErrorColors) -> String {
    let mut hasher = Sha256::new();
    hasher.update(report.title.as_bytes());
    hasher.update([0u8]);
    if let Some(location) = &report.location {
        hasher.update(location.to_string().as_bytes());
    }
    hasher.update([0u8]);
    hasher.update(report.html_content.as_bytes());
    hasher.update([0u8]);
    hasher.update(colors.foreground.as_deref().unwrap_or("").as_bytes());
    hasher.update([0u8]);
    hasher.update(colors.background.as_deref().unwrap_or("").as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use elmlink_core::types::ErrorLocation;

    fn report(title: &str) -> CompileErrorReport {
        CompileErrorReport {
            title: title.to_string(),
            location: Some(ErrorLocation {
                file: "src/Main.elm".to_string(),
                line: 1,
                column: 1,
            }),
            html_content: format!("<p>{title}</p>"),
        }
    }

    #[test]
    fn test_entries_preserve_arrival_order() {
        let overlay = ErrorOverlay::from_reports(
            &[report("FIRST"), report("SECOND")],
            &ErrorColors::default(),
        );
        assert_eq!(overlay.entries[0].report.title, "FIRST");
        assert_eq!(overlay.entries[1].report.title, "SECOND");
    }

    #[test]
    fn test_matching_entry_keeps_expanded_state() {
        let colors = ErrorColors::default();
        let mut overlay = ErrorOverlay::from_reports(&[report("KEPT"), report("DROPPED")], &colors);
        let kept_key = overlay.entries[0].key.clone();
        overlay.set_expanded(&kept_key, true);

        let merged = overlay.merged_with(&[report("KEPT"), report("NEW")], &colors);
        assert_eq!(merged.entries.len(), 2);
        assert!(merged.entries[0].expanded, "kept entry stays expanded");
        assert_eq!(merged.entries[1].report.title, "NEW");
        assert!(!merged.entries[1].expanded);
    }

    #[test]
    fn test_unmatched_old_entries_are_dropped() {
        let colors = ErrorColors::default();
        let overlay = ErrorOverlay::from_reports(&[report("OLD")], &colors);
        let merged = overlay.merged_with(&[report("NEW")], &colors);
        assert_eq!(merged.entries.len(), 1);
        assert_eq!(merged.entries[0].report.title, "NEW");
    }

    #[test]
    fn test_key_depends_on_colors() {
        let plain = ErrorColors::default();
        let tinted = ErrorColors {
            foreground: Some("#fff".to_string()),
            background: None,
        };
        assert_ne!(
            entry_key(&report("SAME"), &plain),
            entry_key(&report("SAME"), &tinted)
        );
    }

    #[test]
    fn test_open_flag_survives_merge() {
        let colors = ErrorColors::default();
        let mut overlay = ErrorOverlay::from_reports(&[report("A")], &colors);
        overlay.open = true;
        let merged = overlay.merged_with(&[report("B")], &colors);
        assert!(merged.open);
    }
}
