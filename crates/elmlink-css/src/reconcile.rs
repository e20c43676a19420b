//! Minimal-diff stylesheet reconciliation
//!
//! Given the live stylesheet and the freshly compiled replacement, mutate
//! the live sheet in place to match, rule by rule, touching as little as
//! possible. Two things make this better than swapping the whole sheet:
//! unrelated rules keep their identity (no flicker, no repaint storm), and
//! declarations the developer edited live in devtools survive a reload that
//! merely restores server state.
//!
//! The decision for every declaration is new-versus-*original* (the value
//! the server's sheet last established), never new-versus-current; that is
//! the whole devtools-preservation trick. A change is applied only when the
//! server actually changed something, and applying it advances the recorded
//! original, which is what makes reconciliation idempotent.
//!
//! This is a "good enough, not maximal" diff: condition changes, unknown
//! rule kinds, and anything else not worth diffing precisely fall back to a
//! wholesale replace at the same index.

use crate::model::{CssRule, ImportRule, StyleRule, Stylesheet};
use crate::parse::parse_stylesheet;

/// Reconcile the live sheet against freshly fetched CSS text.
///
/// Returns `true` if the live sheet was mutated.
pub fn reconcile_text(live: &mut Stylesheet, new_text: &str) -> bool {
    let new = parse_stylesheet(new_text);
    reconcile(live, &new)
}

/// Reconcile the live sheet against an already parsed replacement.
///
/// Returns `true` if the live sheet was mutated.
pub fn reconcile(live: &mut Stylesheet, new: &Stylesheet) -> bool {
    reconcile_rules(&mut live.rules, &new.rules)
}

fn reconcile_rules(live: &mut Vec<CssRule>, new: &[CssRule]) -> bool {
    let mut changed = false;
    let shared = live.len().min(new.len());

    for index in 0..shared {
        changed |= reconcile_rule(&mut live[index], &new[index]);
    }

    // Trailing rules present only on one side.
    if live.len() > new.len() {
        live.truncate(new.len());
        changed = true;
    } else if new.len() > live.len() {
        live.extend(new[shared..].iter().cloned());
        changed = true;
    }

    changed
}

fn reconcile_rule(live: &mut CssRule, new: &CssRule) -> bool {
    match (live, new) {
        (CssRule::Style(live_rule), CssRule::Style(new_rule)) => {
            reconcile_style(live_rule, new_rule)
        }
        (CssRule::Conditional(live_rule), CssRule::Conditional(new_rule))
            if live_rule.kind == new_rule.kind && live_rule.condition == new_rule.condition =>
        {
            reconcile_rules(&mut live_rule.rules, &new_rule.rules)
        }
        (CssRule::Import(live_rule), CssRule::Import(new_rule)) => {
            reconcile_import(live_rule, new_rule)
        }
        (CssRule::Other(live_rule), CssRule::Other(new_rule))
            if live_rule.text == new_rule.text =>
        {
            false
        }
        // Kind mismatch, changed condition, changed opaque text:
        // delete+insert at the same index.
        (live_slot, new_rule) => {
            *live_slot = new_rule.clone();
            true
        }
    }
}

fn reconcile_import(live: &mut ImportRule, new: &ImportRule) -> bool {
    let same_content = match (live.content_hash(), new.content_hash()) {
        (Some(live_hash), Some(new_hash)) => live_hash == new_hash,
        _ => live.text == new.text,
    };
    if same_content {
        match (&mut live.sheet, &new.sheet) {
            (Some(live_sheet), Some(new_sheet)) => reconcile(live_sheet, new_sheet),
            _ => false,
        }
    } else {
        // Fallback full replace of the import.
        *live = new.clone();
        true
    }
}

fn reconcile_style(live: &mut StyleRule, new: &StyleRule) -> bool {
    let mut changed = false;

    if live.selector != new.selector {
        live.selector = new.selector.clone();
        changed = true;
    }

    // Removals: a property the server's sheet used to have and no longer
    // does. A property with no recorded original was added live by the
    // developer, and the server never knew about it, so it stays.
    let live_properties: Vec<String> = live
        .declarations()
        .iter()
        .map(|decl| decl.property.clone())
        .collect();
    for property in live_properties {
        if new.get(&property).is_none() && live.originals.contains_key(&property) {
            live.remove_property(&property);
            live.originals.remove(&property);
            changed = true;
        }
    }

    // Additions and changes: apply only when the new value differs from the
    // recorded original, then advance the original to the applied value.
    for declaration in new.declarations() {
        let matches_original = matches!(
            live.originals.get(&declaration.property),
            Some((value, important))
                if value == &declaration.value && *important == declaration.important
        );
        if !matches_original {
            live.upsert(declaration.clone());
            live.originals.insert(
                declaration.property.clone(),
                (declaration.value.clone(), declaration.important),
            );
            changed = true;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OtherRule;

    fn style_rule<'a>(sheet: &'a Stylesheet, index: usize) -> &'a StyleRule {
        match &sheet.rules[index] {
            CssRule::Style(rule) => rule,
            other => panic!("expected style rule, got {other:?}"),
        }
    }

    fn style_rule_mut<'a>(sheet: &'a mut Stylesheet, index: usize) -> &'a mut StyleRule {
        match &mut sheet.rules[index] {
            CssRule::Style(rule) => rule,
            other => panic!("expected style rule, got {other:?}"),
        }
    }

    #[test]
    fn test_identical_sheets_report_unchanged() {
        let css = "a { color: red } @media print { b { display: none } }";
        let mut live = parse_stylesheet(css);
        assert!(!reconcile_text(&mut live, css));
    }

    #[test]
    fn test_value_change_is_applied() {
        let mut live = parse_stylesheet("a { color: red }");
        assert!(reconcile_text(&mut live, "a { color: green }"));
        assert_eq!(style_rule(&live, 0).get("color").unwrap().value, "green");
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut live = parse_stylesheet("a { color: red; margin: 0 }");
        let new_text = "a { color: green } @media print { b { x: y } }";
        assert!(reconcile_text(&mut live, new_text));
        assert!(!reconcile_text(&mut live, new_text));
    }

    #[test]
    fn test_devtools_edit_survives_unrelated_reload() {
        let mut live = parse_stylesheet("a { color: red; margin: 0 }");
        // Developer tweaks a value live.
        style_rule_mut(&mut live, 0).set_property("color", "hotpink", false);

        // The server re-sends a sheet where only margin changed.
        assert!(reconcile_text(&mut live, "a { color: red; margin: 4px }"));
        let rule = style_rule(&live, 0);
        assert_eq!(rule.get("color").unwrap().value, "hotpink");
        assert_eq!(rule.get("margin").unwrap().value, "4px");
    }

    #[test]
    fn test_devtools_added_property_survives() {
        let mut live = parse_stylesheet("a { color: red }");
        style_rule_mut(&mut live, 0).set_property("outline", "1px solid lime", false);

        // outline is absent from the server sheet both before and after, so
        // it must not be removed.
        assert!(!reconcile_text(&mut live, "a { color: red }"));
        assert!(style_rule(&live, 0).get("outline").is_some());
    }

    #[test]
    fn test_server_change_overrides_devtools_edit() {
        let mut live = parse_stylesheet("a { color: red }");
        style_rule_mut(&mut live, 0).set_property("color", "hotpink", false);

        // The server actually changed the declaration, so it wins.
        assert!(reconcile_text(&mut live, "a { color: blue }"));
        assert_eq!(style_rule(&live, 0).get("color").unwrap().value, "blue");
    }

    #[test]
    fn test_server_removal_is_applied() {
        let mut live = parse_stylesheet("a { color: red; margin: 0 }");
        assert!(reconcile_text(&mut live, "a { color: red }"));
        assert!(style_rule(&live, 0).get("margin").is_none());
        // And a second pass is quiet.
        assert!(!reconcile_text(&mut live, "a { color: red }"));
    }

    #[test]
    fn test_selector_change_in_place() {
        let mut live = parse_stylesheet("a { color: red }");
        // The developer edited color live; the selector rename must not
        // clobber that.
        style_rule_mut(&mut live, 0).set_property("color", "hotpink", false);
        assert!(reconcile_text(&mut live, "a.active { color: red }"));
        let rule = style_rule(&live, 0);
        assert_eq!(rule.selector, "a.active");
        assert_eq!(rule.get("color").unwrap().value, "hotpink");
    }

    #[test]
    fn test_important_flag_change_is_a_change() {
        let mut live = parse_stylesheet("a { color: red }");
        assert!(reconcile_text(&mut live, "a { color: red !important }"));
        assert!(style_rule(&live, 0).get("color").unwrap().important);
    }

    #[test]
    fn test_media_with_same_condition_recurses() {
        let mut live = parse_stylesheet("@media print { a { color: red } }");
        // Devtools edit inside the nested rule.
        match &mut live.rules[0] {
            CssRule::Conditional(rule) => match &mut rule.rules[0] {
                CssRule::Style(style) => style.set_property("color", "hotpink", false),
                other => panic!("unexpected rule: {other:?}"),
            },
            other => panic!("unexpected rule: {other:?}"),
        }

        assert!(reconcile_text(
            &mut live,
            "@media print { a { color: red; margin: 1px } }"
        ));
        match &live.rules[0] {
            CssRule::Conditional(rule) => match &rule.rules[0] {
                CssRule::Style(style) => {
                    // Recursed, so the live edit survived.
                    assert_eq!(style.get("color").unwrap().value, "hotpink");
                    assert_eq!(style.get("margin").unwrap().value, "1px");
                }
                other => panic!("unexpected rule: {other:?}"),
            },
            other => panic!("unexpected rule: {other:?}"),
        }
    }

    #[test]
    fn test_media_with_changed_condition_is_replaced_wholesale() {
        let mut live = parse_stylesheet("@media print { a { color: red } }");
        match &mut live.rules[0] {
            CssRule::Conditional(rule) => match &mut rule.rules[0] {
                CssRule::Style(style) => style.set_property("color", "hotpink", false),
                other => panic!("unexpected rule: {other:?}"),
            },
            other => panic!("unexpected rule: {other:?}"),
        }

        assert!(reconcile_text(&mut live, "@media screen { a { color: red } }"));
        match &live.rules[0] {
            CssRule::Conditional(rule) => {
                assert_eq!(rule.condition, "screen");
                match &rule.rules[0] {
                    // Wholesale replace: the live edit is gone.
                    CssRule::Style(style) => {
                        assert_eq!(style.get("color").unwrap().value, "red")
                    }
                    other => panic!("unexpected rule: {other:?}"),
                }
            }
            other => panic!("unexpected rule: {other:?}"),
        }
    }

    #[test]
    fn test_other_rule_replaced_only_when_text_differs() {
        let keyframes = "@keyframes spin { from { x: 0 } }";
        let mut live = parse_stylesheet(keyframes);
        assert!(!reconcile_text(&mut live, keyframes));
        assert!(reconcile_text(&mut live, "@keyframes spin { from { x: 1 } }"));
    }

    #[test]
    fn test_rule_kind_mismatch_is_replaced_wholesale() {
        let mut live = parse_stylesheet("a { color: red }");
        assert!(reconcile_text(&mut live, "@font-face { font-family: x }"));
        assert!(matches!(&live.rules[0], CssRule::Other(_)));
    }

    #[test]
    fn test_trailing_new_rules_are_appended() {
        let mut live = parse_stylesheet("a { color: red }");
        assert!(reconcile_text(&mut live, "a { color: red } b { color: blue }"));
        assert_eq!(live.rules.len(), 2);
    }

    #[test]
    fn test_trailing_old_rules_are_deleted() {
        let mut live = parse_stylesheet("a { color: red } b { color: blue }");
        assert!(reconcile_text(&mut live, "a { color: red }"));
        assert_eq!(live.rules.len(), 1);
    }

    #[test]
    fn test_import_same_hash_recurses() {
        let mut live = parse_stylesheet("@import url(\"theme.css?hash=aa\");");
        let mut imported_live = parse_stylesheet("a { color: red }");
        match &mut imported_live.rules[0] {
            CssRule::Style(style) => style.set_property("color", "hotpink", false),
            other => panic!("unexpected rule: {other:?}"),
        }
        if let CssRule::Import(import) = &mut live.rules[0] {
            import.sheet = Some(Box::new(imported_live));
        }

        let mut new = parse_stylesheet("@import url(\"theme.css?hash=aa\");");
        if let CssRule::Import(import) = &mut new.rules[0] {
            import.sheet = Some(Box::new(parse_stylesheet("a { color: red; margin: 1px }")));
        }

        assert!(reconcile(&mut live, &new));
        match &live.rules[0] {
            CssRule::Import(import) => {
                let sheet = import.sheet.as_ref().unwrap();
                match &sheet.rules[0] {
                    CssRule::Style(style) => {
                        assert_eq!(style.get("color").unwrap().value, "hotpink");
                        assert_eq!(style.get("margin").unwrap().value, "1px");
                    }
                    other => panic!("unexpected rule: {other:?}"),
                }
            }
            other => panic!("unexpected rule: {other:?}"),
        }
    }

    #[test]
    fn test_import_hash_mismatch_replaces() {
        let mut live = parse_stylesheet("@import url(\"theme.css?hash=aa\");");
        assert!(reconcile_text(&mut live, "@import url(\"theme.css?hash=bb\");"));
        match &live.rules[0] {
            CssRule::Import(import) => assert_eq!(import.href, "theme.css?hash=bb"),
            other => panic!("unexpected rule: {other:?}"),
        }
    }

    #[test]
    fn test_import_without_hashes_compares_text() {
        let mut live = parse_stylesheet("@import \"plain.css\";");
        assert!(!reconcile_text(&mut live, "@import \"plain.css\";"));
        assert!(reconcile_text(&mut live, "@import \"other.css\";"));
    }

    #[test]
    fn test_unparseable_chunk_round_trips_as_other() {
        let mut live = Stylesheet {
            rules: vec![CssRule::Other(OtherRule {
                text: "garbage".to_string(),
            })],
        };
        assert!(!reconcile(
            &mut live,
            &Stylesheet {
                rules: vec![CssRule::Other(OtherRule {
                    text: "garbage".to_string(),
                })],
            }
        ));
    }
}
