//! Free-name extraction from query expressions.
//!
//! A lightweight scanner, not a parser: it finds identifiers that could name a
//! table or view. Field accesses (`x.field`), function calls (`max(`), record
//! labels (`time:`), named arguments (`window=`), `$input`, keywords,
//! `let` binders and string-literal contents are skipped.

use std::collections::BTreeSet;

const KEYWORDS: &[&str] = &["let", "in", "true", "false", "null"];

/// Identifiers in `expression` that may refer to other resources.
#[must_use]
pub fn expression_identifiers(expression: &str) -> BTreeSet<String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut names = BTreeSet::new();
    let mut binders = BTreeSet::new();
    let mut after_let = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '"' || c == '\'' {
            i = skip_string(&chars, i);
            continue;
        }

        if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            if std::mem::replace(&mut after_let, ident == "let") {
                binders.insert(ident);
                continue;
            }

            let before = previous_significant(&chars, start);
            let after = next_significant(&chars, i);
            let is_access = matches!(before, Some('.' | '$'));
            let is_call_or_label = matches!(after, Some((_, '(' | ':')));
            let is_named_arg = matches!(after, Some((j, '=')) if chars.get(j + 1) != Some(&'='));

            if !(is_access || is_call_or_label || is_named_arg || KEYWORDS.contains(&ident.as_str())) {
                names.insert(ident);
            }
            continue;
        }

        i += 1;
    }

    names.retain(|name| !binders.contains(name));
    names
}

/// Index just past the closing quote of the literal starting at `start`.
fn skip_string(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

fn previous_significant(chars: &[char], end: usize) -> Option<char> {
    chars[..end].iter().rev().copied().find(|c| !c.is_whitespace())
}

fn next_significant(chars: &[char], start: usize) -> Option<(usize, char)> {
    chars
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, c)| (i, *c))
}
