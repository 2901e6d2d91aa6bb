//! Ingredient normalization.
//!
//! Ingredients arrive as a plain sequence, as a serialized list (`['a', "b"]`),
//! or as a comma-separated string. All three normalize into an [`IngredientSet`]:
//! trimmed, lower-cased, non-empty, first-seen order, no case/whitespace duplicates.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{CoreError, Result};

/// Separator used when rendering an ingredient set as text.
pub const INGREDIENT_SEPARATOR: &str = ", ";

/// Surface form of raw ingredient input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngredientInput {
    /// Already a sequence of ingredient strings.
    Sequence(Vec<String>),
    /// Text holding a serialized list, e.g. `["chicken", "onion"]`.
    ListLiteral(String),
    /// Comma-delimited text, e.g. `chicken, onion`.
    Delimited(String),
}

impl IngredientInput {
    /// Classify raw text: a leading `[` marks a list literal, anything else is delimited.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim_start().starts_with('[') {
            IngredientInput::ListLiteral(text)
        } else {
            IngredientInput::Delimited(text)
        }
    }

    fn into_items(self) -> Result<Vec<String>> {
        match self {
            IngredientInput::Sequence(items) => Ok(items),
            IngredientInput::ListLiteral(text) => parse_list_literal(&text),
            IngredientInput::Delimited(text) => {
                Ok(text.split(',').map(str::to_string).collect())
            }
        }
    }
}

impl From<&str> for IngredientInput {
    fn from(text: &str) -> Self {
        IngredientInput::from_text(text)
    }
}

impl From<String> for IngredientInput {
    fn from(text: String) -> Self {
        IngredientInput::from_text(text)
    }
}

impl From<Vec<String>> for IngredientInput {
    fn from(items: Vec<String>) -> Self {
        IngredientInput::Sequence(items)
    }
}

impl From<&[&str]> for IngredientInput {
    fn from(items: &[&str]) -> Self {
        IngredientInput::Sequence(items.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&[String]> for IngredientInput {
    fn from(items: &[String]) -> Self {
        IngredientInput::Sequence(items.to_vec())
    }
}

/// Ordered, normalized, duplicate-free ingredient names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IngredientSet(Vec<String>);

impl IngredientSet {
    /// Ingredients in first-seen order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Text rendering fed to the embedding model.
    ///
    /// Order is significant: the same ingredients in a different order embed differently.
    pub fn to_text(&self) -> String {
        self.0.join(INGREDIENT_SEPARATOR)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for sets built by [`normalize`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'a> IntoIterator for &'a IngredientSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Normalize any supported ingredient input.
///
/// # Errors
///
/// - [`CoreError::MalformedIngredientList`] when list-literal text does not parse.
/// - [`CoreError::EmptyIngredientSet`] when nothing usable remains.
pub fn normalize(input: impl Into<IngredientInput>) -> Result<IngredientSet> {
    let items = input.into().into_items()?;

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(items.len());

    for item in items {
        let cleaned = item.trim().to_lowercase();
        if cleaned.is_empty() {
            continue;
        }
        // Duplicates are judged with internal whitespace runs collapsed.
        let key = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if seen.insert(key) {
            normalized.push(cleaned);
        }
    }

    if normalized.is_empty() {
        return Err(CoreError::EmptyIngredientSet);
    }

    Ok(IngredientSet(normalized))
}

/// Parse a bracketed list of strings: JSON first, then Python-style
/// single- or double-quoted literals.
fn parse_list_literal(text: &str) -> Result<Vec<String>> {
    if let Ok(items) = serde_json::from_str::<Vec<String>>(text.trim()) {
        return Ok(items);
    }
    parse_quoted_list(text)
}

fn parse_quoted_list(text: &str) -> Result<Vec<String>> {
    let malformed = |reason: &str| CoreError::MalformedIngredientList(reason.to_string());

    let body = text
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| malformed("expected text enclosed in [ and ]"))?;

    let mut items = Vec::new();
    let mut chars = body.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(c) => {
                return Err(CoreError::MalformedIngredientList(format!(
                    "expected a quoted string, found '{}'",
                    c
                )))
            }
        };

        let mut item = String::new();
        loop {
            match chars.next() {
                None => return Err(malformed("unterminated string")),
                Some('\\') => match chars.next() {
                    Some('n') => item.push('\n'),
                    Some('t') => item.push('\t'),
                    Some('r') => item.push('\r'),
                    Some('x') => item.push(hex_escape(&mut chars, 2)?),
                    Some('u') => item.push(hex_escape(&mut chars, 4)?),
                    Some('U') => item.push(hex_escape(&mut chars, 8)?),
                    Some(c) => item.push(c),
                    None => return Err(malformed("dangling escape")),
                },
                Some(c) if c == quote => break,
                Some(c) => item.push(c),
            }
        }
        items.push(item);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(c) => {
                return Err(CoreError::MalformedIngredientList(format!(
                    "expected ',' between items, found '{}'",
                    c
                )))
            }
        }
    }

    Ok(items)
}

/// Decode the `digits` hex digits following `\x`, `\u` or `\U`.
fn hex_escape(chars: &mut impl Iterator<Item = char>, digits: usize) -> Result<char> {
    let hex: String = chars.take(digits).collect();
    if hex.chars().count() != digits {
        return Err(CoreError::MalformedIngredientList(format!(
            "truncated escape '{}'",
            hex
        )));
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| CoreError::MalformedIngredientList(format!("invalid escape '{}'", hex)))
}
