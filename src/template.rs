//! Fail-closed template binding.
//!
//! The binder substitutes values into a text template at `{{name}}` markers.
//! Unlike a naive string replace, binding fails closed: a marker with no
//! matching context entry is an error, so a document with an unreplaced
//! marker can never reach recipients. Substitution is a single left-to-right
//! pass: bound values are emitted verbatim and never rescanned, which rules
//! out injection through nested markers.
//!
//! The reserved marker for the signed card token is
//! [`SIGNED_CARD_PLACEHOLDER`] (`{{signedCardPayload}}`).
//!
//! # Examples
//!
//! ```
//! use signed_card_service::template::{bind, TemplateContext};
//!
//! # fn example() -> signed_card_service::error::Result<()> {
//! let mut context = TemplateContext::new();
//! context.insert("signedCardPayload", "eyJhbGciOi.eyJzZW5kZXIi.c2ln")?;
//!
//! let body = bind("<script>{{signedCardPayload}}</script>", &context)?;
//! assert_eq!(body, "<script>eyJhbGciOi.eyJzZW5kZXIi.c2ln</script>");
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use crate::error::{CardError, Result};

/// Reserved marker name for the signed card token.
pub const SIGNED_CARD_PLACEHOLDER: &str = "signedCardPayload";

const MARKER_OPEN: &str = "{{";
const MARKER_CLOSE: &str = "}}";

/// Mapping of placeholder names to substitution values.
///
/// Values must not contain the marker delimiter syntax; [`insert`](Self::insert)
/// enforces this so a bound value can never be mistaken for a marker.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    entries: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Creates an empty context.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Adds a substitution value for a placeholder name.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::EncodingFailure`] if the value contains the
    /// marker delimiter, which would corrupt the template syntax.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<()> {
        if value.contains(MARKER_OPEN) {
            return Err(CardError::EncodingFailure(format!(
                "substitution value for {name} contains the marker delimiter"
            )));
        }
        self.entries.insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    /// Returns the value bound to a placeholder name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Number of bound placeholders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no placeholders are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Substitutes context values into a template.
///
/// Scans the template once from left to right, replacing each `{{name}}`
/// marker with its bound value. Values are emitted verbatim; there is no
/// recursive expansion. Text outside markers is copied unchanged.
///
/// # Errors
///
/// Returns [`CardError::MissingPlaceholder`] if a marker has no bound value
/// or is never terminated. Binding fails closed: either every marker is
/// replaced or no output is produced.
pub fn bind(template: &str, context: &TemplateContext) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(MARKER_OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + MARKER_OPEN.len()..];

        let end = after_open.find(MARKER_CLOSE).ok_or_else(|| {
            CardError::MissingPlaceholder("unterminated marker at end of template".to_owned())
        })?;

        let name = after_open[..end].trim();
        let value = context
            .get(name)
            .ok_or_else(|| CardError::MissingPlaceholder(name.to_owned()))?;

        out.push_str(value);
        rest = &after_open[end + MARKER_CLOSE.len()..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> TemplateContext {
        let mut context = TemplateContext::new();
        for (name, value) in pairs {
            context.insert(name, value).unwrap();
        }
        context
    }

    #[test]
    fn test_bind_single_marker() {
        let out = bind("Token: {{signedCardPayload}}", &context(&[("signedCardPayload", "abc")]))
            .unwrap();
        assert_eq!(out, "Token: abc");
    }

    #[test]
    fn test_bind_repeated_marker() {
        let out = bind("{{x}} and {{x}}", &context(&[("x", "1")])).unwrap();
        assert_eq!(out, "1 and 1");
    }

    #[test]
    fn test_bind_multiple_markers() {
        let out = bind("{{a}}-{{b}}", &context(&[("a", "1"), ("b", "2")])).unwrap();
        assert_eq!(out, "1-2");
    }

    #[test]
    fn test_bind_no_markers_is_identity() {
        let out = bind("plain text, no markers", &TemplateContext::new()).unwrap();
        assert_eq!(out, "plain text, no markers");
    }

    #[test]
    fn test_missing_placeholder_fails_closed() {
        let result = bind("Token: {{signedCardPayload}}", &TemplateContext::new());

        assert!(matches!(result, Err(CardError::MissingPlaceholder(ref name))
            if name == "signedCardPayload"));
    }

    #[test]
    fn test_unterminated_marker_is_error() {
        let result = bind("Token: {{signedCardPayload", &context(&[("signedCardPayload", "x")]));
        assert!(matches!(result, Err(CardError::MissingPlaceholder(_))));
    }

    #[test]
    fn test_marker_name_is_trimmed() {
        let out = bind("{{ x }}", &context(&[("x", "v")])).unwrap();
        assert_eq!(out, "v");
    }

    #[test]
    fn test_no_recursive_expansion() {
        // Bound values are emitted verbatim and never rescanned; only the
        // template itself is parsed for markers
        let out = bind("{{a}}{{b}}", &context(&[("a", "}}"), ("b", "v")])).unwrap();
        assert_eq!(out, "}}v");
    }

    #[test]
    fn test_insert_rejects_marker_delimiter() {
        let mut ctx = TemplateContext::new();
        let result = ctx.insert("a", "{{b}}");

        assert!(matches!(result, Err(CardError::EncodingFailure(_))));
    }

    #[test]
    fn test_html_template_shape() {
        let template = concat!(
            "<html><head>",
            "<script type=\"application/adaptivecard+json\">{{signedCardPayload}}</script>",
            "</head><body></body></html>",
        );
        let out = bind(template, &context(&[("signedCardPayload", "h.p.s")])).unwrap();

        assert!(out.contains(">h.p.s</script>"));
        assert!(!out.contains("{{"));
    }
}
