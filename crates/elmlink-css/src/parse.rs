//! CSS text → stylesheet model
//!
//! A deliberately small, error-tolerant parser. It only needs to be exact
//! about rule boundaries and declaration lists, the granularity the
//! reconciler diffs at. Anything it cannot confidently model (keyframes,
//! font-face, nested style rules, stray garbage) becomes an opaque
//! [`OtherRule`] that the reconciler replaces wholesale, which matches how
//! those rule kinds are treated anyway.

use crate::model::{
    ConditionalKind, ConditionalRule, CssRule, Declaration, ImportRule, OtherRule, StyleRule,
    Stylesheet,
};

/// Parse CSS text into the stylesheet model.
///
/// Never fails: invalid chunks are preserved as opaque rules rather than
/// dropped, mirroring how error-tolerant stylesheet loading behaves.
pub fn parse_stylesheet(text: &str) -> Stylesheet {
    Stylesheet {
        rules: parse_rules(text),
    }
}

fn parse_rules(input: &str) -> Vec<CssRule> {
    let mut rules = Vec::new();
    let mut rest = input;
    loop {
        rest = skip_trivia(rest);
        if rest.is_empty() {
            break;
        }
        let Some((index, terminator)) = find_top_level(rest, &['{', ';']) else {
            // Unterminated tail; keep it opaque.
            rules.push(CssRule::Other(OtherRule {
                text: rest.trim().to_string(),
            }));
            break;
        };
        if terminator == ';' {
            let text = rest[..=index].trim().to_string();
            rules.push(parse_statement(text));
            rest = &rest[index + 1..];
        } else {
            let prelude = rest[..index].trim().to_string();
            let Some(close) = find_matching_brace(&rest[index..]) else {
                rules.push(CssRule::Other(OtherRule {
                    text: rest.trim().to_string(),
                }));
                break;
            };
            let body = &rest[index + 1..index + close];
            let full = rest[..index + close + 1].trim().to_string();
            rules.push(parse_block(&prelude, body, full));
            rest = &rest[index + close + 1..];
        }
    }
    rules
}

/// A rule terminated by `;`: `@import`, `@charset`, `@layer a, b;`
fn parse_statement(text: String) -> CssRule {
    if text.starts_with("@import") {
        let href = extract_import_href(&text).unwrap_or_default();
        CssRule::Import(ImportRule {
            href,
            text,
            sheet: None,
        })
    } else {
        CssRule::Other(OtherRule { text })
    }
}

/// A rule with a `{ … }` block
fn parse_block(prelude: &str, body: &str, full: String) -> CssRule {
    for (keyword, kind) in [
        ("@media", ConditionalKind::Media),
        ("@supports", ConditionalKind::Supports),
        ("@container", ConditionalKind::Container),
        ("@layer", ConditionalKind::Layer),
    ] {
        if let Some(condition) = strip_at_keyword(prelude, keyword) {
            return CssRule::Conditional(ConditionalRule {
                kind,
                condition: condition.to_string(),
                rules: parse_rules(body),
            });
        }
    }

    if strip_at_keyword(prelude, "@page").is_some() {
        // @page blocks hold declarations, so they diff like style rules.
        return CssRule::Style(StyleRule::new(prelude, parse_declarations(body)));
    }

    if prelude.starts_with('@') {
        // @keyframes, @font-face, @property, anything unknown.
        return CssRule::Other(OtherRule { text: full });
    }

    if find_top_level(body, &['{']).is_some() {
        // Nested style rules are not worth diffing precisely.
        return CssRule::Other(OtherRule { text: full });
    }

    CssRule::Style(StyleRule::new(prelude, parse_declarations(body)))
}

fn parse_declarations(body: &str) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    let mut rest = body;
    loop {
        rest = skip_trivia(rest);
        if rest.is_empty() {
            break;
        }
        let (chunk, remainder) = match find_top_level(rest, &[';']) {
            Some((index, _)) => (&rest[..index], &rest[index + 1..]),
            None => (rest, ""),
        };
        if let Some(declaration) = parse_declaration(chunk) {
            declarations.push(declaration);
        }
        rest = remainder;
    }
    declarations
}

fn parse_declaration(chunk: &str) -> Option<Declaration> {
    let chunk = chunk.trim();
    let (property, value) = chunk.split_once(':')?;
    let property = property.trim();
    if property.is_empty() {
        return None;
    }
    let mut value = value.trim().to_string();
    let mut important = false;
    if let Some(stripped) = strip_important(&value) {
        value = stripped;
        important = true;
    }
    Some(Declaration {
        property: property.to_string(),
        value,
        important,
    })
}

fn strip_important(value: &str) -> Option<String> {
    let bang = value.rfind('!')?;
    if value[bang + 1..].trim().eq_ignore_ascii_case("important") {
        Some(value[..bang].trim_end().to_string())
    } else {
        None
    }
}

/// `@import url("x.css")` / `@import "x.css" screen;` → `x.css`
fn extract_import_href(text: &str) -> Option<String> {
    let rest = text.strip_prefix("@import")?.trim_start();
    if let Some(inner) = rest.strip_prefix("url(") {
        let end = inner.find(')')?;
        let inner = inner[..end].trim();
        Some(
            inner
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string(),
        )
    } else if rest.starts_with('"') || rest.starts_with('\'') {
        let quote = rest.chars().next()?;
        let inner = &rest[1..];
        let end = inner.find(quote)?;
        Some(inner[..end].to_string())
    } else {
        None
    }
}

/// Strip `keyword` from `prelude` if it is the whole at-keyword (not a
/// prefix of a longer one), returning the trimmed remainder
fn strip_at_keyword<'a>(prelude: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = prelude.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with('(') {
        Some(rest.trim())
    } else {
        None
    }
}

/// Skip whitespace and `/* … */` comments
fn skip_trivia(mut input: &str) -> &str {
    loop {
        let trimmed = input.trim_start();
        if let Some(after) = trimmed.strip_prefix("/*") {
            match after.find("*/") {
                Some(end) => input = &after[end + 2..],
                None => return "",
            }
        } else {
            return trimmed;
        }
    }
}

/// Find the first of `targets` at nesting depth zero, skipping strings,
/// comments, parentheses, and braces
fn find_top_level(input: &str, targets: &[char]) -> Option<(usize, char)> {
    let mut chars = input.char_indices().peekable();
    let mut paren_depth = 0usize;
    let mut brace_depth = 0usize;
    while let Some((index, c)) = chars.next() {
        match c {
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = '\0';
                for (_, cc) in chars.by_ref() {
                    if prev == '*' && cc == '/' {
                        break;
                    }
                    prev = cc;
                }
            }
            '"' | '\'' => skip_string(&mut chars, c),
            _ if brace_depth == 0 && paren_depth == 0 && targets.contains(&c) => {
                return Some((index, c));
            }
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '{' => brace_depth += 1,
            '}' => brace_depth = brace_depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Given input whose first char is `{`, find the byte index of the matching
/// `}`
fn find_matching_brace(input: &str) -> Option<usize> {
    let mut chars = input.char_indices().peekable();
    let mut depth = 0usize;
    while let Some((index, c)) = chars.next() {
        match c {
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = '\0';
                for (_, cc) in chars.by_ref() {
                    if prev == '*' && cc == '/' {
                        break;
                    }
                    prev = cc;
                }
            }
            '"' | '\'' => skip_string(&mut chars, c),
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn skip_string(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, quote: char) {
    let mut escaped = false;
    for (_, c) in chars.by_ref() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            break;
        }
    }
}
