//! Live stylesheet object model
//!
//! The reconciler needs a mutable, rule-granular view of a stylesheet: it
//! patches individual selectors and declarations in place instead of
//! swapping whole sheets, so temporary edits the developer made live (the
//! devtools workflow) survive a hot reload. Style rules therefore remember
//! the *original* value of every declaration (the value the server's sheet
//! established) separately from the current, possibly edited, value.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

/// A parsed stylesheet: an ordered list of rules
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

impl Stylesheet {
    /// Serialize back to CSS text (normalized whitespace)
    pub fn css_text(&self) -> String {
        let texts: Vec<String> = self.rules.iter().map(|rule| rule.css_text()).collect();
        texts.join("\n")
    }

    /// sha256 hex digest of the serialized sheet
    pub fn content_hash(&self) -> String {
        hex_digest(self.css_text().as_bytes())
    }
}

/// One rule in a stylesheet
#[derive(Debug, Clone)]
pub enum CssRule {
    /// A selector with declarations (`a:hover { … }`, also `@page { … }`)
    Style(StyleRule),
    /// A nested-rule container: `@media`, `@supports`, `@container`,
    /// `@layer` block form
    Conditional(ConditionalRule),
    /// `@import`, possibly with the imported sheet attached
    Import(ImportRule),
    /// Anything the reconciler only replaces wholesale: `@keyframes`,
    /// `@font-face`, `@charset`, unknown at-rules, unparseable chunks
    Other(OtherRule),
}

impl CssRule {
    pub fn css_text(&self) -> String {
        match self {
            CssRule::Style(rule) => rule.css_text(),
            CssRule::Conditional(rule) => rule.css_text(),
            CssRule::Import(rule) => rule.text.clone(),
            CssRule::Other(rule) => rule.text.clone(),
        }
    }
}

/// One `property: value` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn css_text(&self) -> String {
        if self.important {
            format!("{}: {} !important", self.property, self.value)
        } else {
            format!("{}: {}", self.property, self.value)
        }
    }
}

/// A selector plus its declarations.
///
/// `originals` records, per property, the value the server-sent sheet
/// established, snapshotted at parse time and advanced whenever the
/// reconciler applies a change. Live edits through [`set_property`] /
/// [`remove_property`] deliberately do not touch it; that is what lets the
/// reconciler tell "the server changed this" from "the developer changed
/// this in devtools".
///
/// [`set_property`]: StyleRule::set_property
/// [`remove_property`]: StyleRule::remove_property
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: String,
    declarations: Vec<Declaration>,
    pub(crate) originals: HashMap<String, (String, bool)>,
}

impl StyleRule {
    /// Build a rule as parsed from server-sent CSS; every declaration's
    /// current value becomes its recorded original.
    pub fn new(selector: impl Into<String>, declarations: Vec<Declaration>) -> Self {
        let originals = declarations
            .iter()
            .map(|decl| {
                (
                    decl.property.clone(),
                    (decl.value.clone(), decl.important),
                )
            })
            .collect();
        Self {
            selector: selector.into(),
            declarations,
            originals,
        }
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn get(&self, property: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|decl| decl.property == property)
    }

    /// Live edit: set a property without recording it as server state
    pub fn set_property(&mut self, property: &str, value: &str, important: bool) {
        self.upsert(Declaration {
            property: property.to_string(),
            value: value.to_string(),
            important,
        });
    }

    /// Live edit: remove a property without recording it as server state
    pub fn remove_property(&mut self, property: &str) {
        self.declarations.retain(|decl| decl.property != property);
    }

    pub(crate) fn upsert(&mut self, declaration: Declaration) {
        match self
            .declarations
            .iter_mut()
            .find(|decl| decl.property == declaration.property)
        {
            Some(existing) => *existing = declaration,
            None => self.declarations.push(declaration),
        }
    }

    pub fn css_text(&self) -> String {
        let decls: Vec<String> = self
            .declarations
            .iter()
            .map(|decl| decl.css_text())
            .collect();
        format!("{} {{ {}; }}", self.selector, decls.join("; "))
    }
}

/// Which container at-rule a [`ConditionalRule`] is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalKind {
    Media,
    Supports,
    Container,
    Layer,
}

impl ConditionalKind {
    pub fn at_keyword(&self) -> &'static str {
        match self {
            ConditionalKind::Media => "@media",
            ConditionalKind::Supports => "@supports",
            ConditionalKind::Container => "@container",
            ConditionalKind::Layer => "@layer",
        }
    }
}

/// A nested-rule container (`@media screen { … }` and friends)
#[derive(Debug, Clone)]
pub struct ConditionalRule {
    pub kind: ConditionalKind,
    /// Everything between the at-keyword and the opening brace
    pub condition: String,
    pub rules: Vec<CssRule>,
}

impl ConditionalRule {
    pub fn css_text(&self) -> String {
        let inner: Vec<String> = self.rules.iter().map(|rule| rule.css_text()).collect();
        format!(
            "{} {} {{ {} }}",
            self.kind.at_keyword(),
            self.condition,
            inner.join(" ")
        )
    }
}

/// An `@import` rule, optionally with its imported sheet attached for
/// recursive reconciliation
#[derive(Debug, Clone)]
pub struct ImportRule {
    pub href: String,
    /// The full rule text as parsed
    pub text: String,
    pub sheet: Option<Box<Stylesheet>>,
}

impl ImportRule {
    /// The content hash this import resolves to.
    ///
    /// A `hash` query parameter on the href wins (the server stamps one so
    /// clients can compare without fetching); otherwise the hash of the
    /// attached sheet, if any.
    pub fn content_hash(&self) -> Option<String> {
        if let Some(query) = self.href.split_once('?').map(|(_, q)| q) {
            for pair in query.split('&') {
                if let Some(value) = pair.strip_prefix("hash=") {
                    return Some(value.to_string());
                }
            }
        }
        self.sheet.as_ref().map(|sheet| sheet.content_hash())
    }
}

/// A rule the reconciler treats as opaque text
#[derive(Debug, Clone)]
pub struct OtherRule {
    pub text: String,
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(property: &str, value: &str) -> Declaration {
        Declaration {
            property: property.to_string(),
            value: value.to_string(),
            important: false,
        }
    }

    #[test]
    fn test_style_rule_snapshots_originals() {
        let rule = StyleRule::new("a", vec![decl("color", "red")]);
        assert_eq!(
            rule.originals.get("color"),
            Some(&("red".to_string(), false))
        );
    }

    #[test]
    fn test_live_edit_does_not_touch_originals() {
        let mut rule = StyleRule::new("a", vec![decl("color", "red")]);
        rule.set_property("color", "blue", false);
        rule.set_property("outline", "1px solid", false);

        assert_eq!(rule.get("color").unwrap().value, "blue");
        assert_eq!(
            rule.originals.get("color"),
            Some(&("red".to_string(), false))
        );
        assert!(!rule.originals.contains_key("outline"));
    }

    #[test]
    fn test_declaration_css_text_important() {
        let declaration = Declaration {
            property: "color".to_string(),
            value: "red".to_string(),
            important: true,
        };
        assert_eq!(declaration.css_text(), "color: red !important");
    }

    #[test]
    fn test_import_hash_from_query_parameter() {
        let import = ImportRule {
            href: "theme.css?v=2&hash=abc123".to_string(),
            text: "@import url(\"theme.css?v=2&hash=abc123\");".to_string(),
            sheet: None,
        };
        assert_eq!(import.content_hash().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_import_hash_falls_back_to_sheet() {
        let sheet = Stylesheet {
            rules: vec![CssRule::Style(StyleRule::new(
                "a",
                vec![decl("color", "red")],
            ))],
        };
        let import = ImportRule {
            href: "theme.css".to_string(),
            text: "@import \"theme.css\";".to_string(),
            sheet: Some(Box::new(sheet.clone())),
        };
        assert_eq!(import.content_hash(), Some(sheet.content_hash()));
    }

    #[test]
    fn test_content_hash_is_stable() {
        let sheet = Stylesheet {
            rules: vec![CssRule::Style(StyleRule::new(
                "a",
                vec![decl("color", "red")],
            ))],
        };
        assert_eq!(sheet.content_hash(), sheet.content_hash());
        assert_eq!(sheet.content_hash().len(), 64);
    }
}
