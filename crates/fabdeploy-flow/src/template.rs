//! Placeholder substitution in item definitions and plain text.
//!
//! A [`Substitutions`] map is applied token by token, in insertion order, to
//! the decoded text of one named part of an [`ItemDefinition`]. Every other
//! part is passed through untouched. A part that contains none of the tokens
//! is also returned untouched, so an empty or non-matching map leaves the
//! definition byte-identical.
//!
//! Applying a map twice only gives the first-round result when no
//! replacement value contains a token; [`Substitutions::assert_disjoint`]
//! checks that precondition.

use fabdeploy_client::model::{ItemDefinition, ItemDefinitionPart};

use crate::error::{Error, Result};

/// Ordered token → replacement map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    entries: Vec<(String, String)>,
}

impl Substitutions {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a replacement, returning the map.
    #[must_use]
    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(token, value);
        self
    }

    /// Adds or replaces a replacement. Empty tokens are ignored.
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        let token = token.into();
        if token.is_empty() {
            return;
        }
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == token) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((token, value)),
        }
    }

    /// Returns true if there are no replacements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of replacements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over `(token, value)` pairs in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    /// Returns true if any token occurs in `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.entries.iter().any(|(token, _)| text.contains(token.as_str()))
    }

    /// Checks that no replacement value contains any token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OverlappingTokens`] naming the first token found
    /// inside a value.
    pub fn assert_disjoint(&self) -> Result<()> {
        for (_, value) in &self.entries {
            if let Some((token, _)) = self
                .entries
                .iter()
                .find(|(token, _)| value.contains(token.as_str()))
            {
                return Err(Error::OverlappingTokens {
                    token: token.clone(),
                });
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Substitutions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (token, value) in iter {
            map.insert(token, value);
        }
        map
    }
}

/// Replaces every occurrence of every token in `text`.
#[must_use]
pub fn substitute_text(text: &str, substitutions: &Substitutions) -> String {
    substitutions
        .iter()
        .fold(text.to_string(), |acc, (token, value)| acc.replace(token, value))
}

/// Substitutes tokens in the part at `path`.
///
/// # Errors
///
/// Returns [`Error::PartNotFound`] if no part has that path, or an error if
/// the part payload is not base64-encoded UTF-8.
pub fn substitute_part(
    definition: &ItemDefinition,
    path: &str,
    substitutions: &Substitutions,
) -> Result<ItemDefinition> {
    let mut updated = definition.clone();
    let part = updated
        .parts
        .iter_mut()
        .find(|part| part.path == path)
        .ok_or_else(|| Error::PartNotFound {
            path: path.to_string(),
        })?;
    let text = part.decode_text()?;
    if substitutions.matches(&text) {
        *part = ItemDefinitionPart::from_text(path, &substitute_text(&text, substitutions));
    }
    Ok(updated)
}

/// Like [`substitute_part`], but a missing part logs a warning and returns
/// the definition unchanged.
///
/// # Errors
///
/// Returns an error if the part exists but cannot be decoded.
pub fn substitute_part_tolerant(
    definition: &ItemDefinition,
    path: &str,
    substitutions: &Substitutions,
) -> Result<ItemDefinition> {
    match substitute_part(definition, path, substitutions) {
        Err(Error::PartNotFound { path }) => {
            tracing::warn!(path = %path, "definition part not found, leaving definition unchanged");
            Ok(definition.clone())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn definition(parts: &[(&str, &str)]) -> ItemDefinition {
        ItemDefinition::new(
            parts
                .iter()
                .map(|(path, text)| ItemDefinitionPart::from_text(*path, text))
                .collect(),
        )
    }

    #[test]
    fn replaces_every_occurrence_in_named_part_only() {
        let input = definition(&[
            ("definition/expressions.tmdl", "a {ONELAKE_PATH} b {ONELAKE_PATH}"),
            ("definition/model.tmdl", "{ONELAKE_PATH}"),
        ]);
        let subs = Substitutions::new().with("{ONELAKE_PATH}", "https://onelake/ws/lh/");

        let output = substitute_part(&input, "definition/expressions.tmdl", &subs).unwrap();

        assert_eq!(
            output.parts[0].decode_text().unwrap(),
            "a https://onelake/ws/lh/ b https://onelake/ws/lh/"
        );
        assert_eq!(output.parts[1], input.parts[1]);
        assert_eq!(output.parts.len(), 2);
        assert_eq!(output.parts[0].path, "definition/expressions.tmdl");
    }

    #[test]
    fn missing_part_is_an_error_in_strict_mode() {
        let input = definition(&[("model.bim", "{}")]);
        let err = substitute_part(&input, "nope", &Substitutions::new().with("x", "y")).unwrap_err();
        assert!(matches!(err, Error::PartNotFound { path } if path == "nope"));
    }

    #[test]
    fn missing_part_is_a_no_op_in_tolerant_mode() {
        let input = definition(&[("model.bim", "{X}")]);
        let output =
            substitute_part_tolerant(&input, "nope", &Substitutions::new().with("{X}", "y")).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn disjointness_is_checked() {
        let ok = Substitutions::new().with("{A}", "1").with("{B}", "2");
        assert!(ok.assert_disjoint().is_ok());

        let overlapping = Substitutions::new().with("{A}", "x{B}x").with("{B}", "2");
        assert!(matches!(
            overlapping.assert_disjoint(),
            Err(Error::OverlappingTokens { token }) if token == "{B}"
        ));
    }

    #[test]
    fn text_substitution_applies_in_insertion_order() {
        let subs = Substitutions::new()
            .with("@EmbedReportId", "r-1")
            .with("EmbedTokenType", "models.TokenType.Embed");
        assert_eq!(
            substitute_text("id=@EmbedReportId type=EmbedTokenType", &subs),
            "id=r-1 type=models.TokenType.Embed"
        );
    }

    #[test]
    fn insert_overwrites_existing_token() {
        let subs: Substitutions = [("{A}", "1"), ("{A}", "2")].into_iter().collect();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs.iter().next(), Some(("{A}", "2")));
    }

    proptest! {
        #[test]
        fn empty_map_leaves_definition_identical(text in ".*") {
            let input = definition(&[("part", text.as_str())]);
            let output = substitute_part(&input, "part", &Substitutions::new()).unwrap();
            prop_assert_eq!(output, input);
        }

        #[test]
        fn absent_tokens_are_a_no_op(text in "[a-z ]*") {
            let input = definition(&[("part", text.as_str())]);
            let subs = Substitutions::new().with("{TOKEN}", "value");
            let output = substitute_part(&input, "part", &subs).unwrap();
            prop_assert_eq!(output, input);
        }

        #[test]
        fn disjoint_maps_are_idempotent(
            text in "[a-z{}A-Z_ ]*",
            value in "[a-z0-9/:.]+",
        ) {
            let subs = Substitutions::new().with("{TOKEN}", value);
            prop_assert!(subs.assert_disjoint().is_ok());
            let once = substitute_text(&text, &subs);
            let twice = substitute_text(&once, &subs);
            prop_assert_eq!(once, twice);
        }
    }
}
