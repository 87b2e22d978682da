//! Expectation marker recognition
//!
//! A marker is a line comment of the form `// <prefix>[<kind>] free text`.

use regex::Regex;

use crate::backend::diagnostics::DiagnosticKind;

use super::FixtureError;

pub const DEFAULT_PREFIX: &str = "$ExpectError";
pub const FLOW_PREFIX: &str = "$FlowExpectedError";

/// Prefixes recognized when none are configured
pub const DEFAULT_PREFIXES: &[&str] = &[DEFAULT_PREFIX, FLOW_PREFIX];

/// Compiled marker pattern for a set of accepted prefixes
#[derive(Debug, Clone)]
pub struct MarkerSyntax {
    pattern: Regex,
}

impl MarkerSyntax {
    pub fn new<S: AsRef<str>>(prefixes: &[S]) -> Result<Self, FixtureError> {
        if prefixes.is_empty() {
            return Err(FixtureError::new(0, 0, "at least one marker prefix is required"));
        }
        let alternatives = prefixes
            .iter()
            .map(|p| regex::escape(p.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"^\s*(?:{})\[([^\]]*)\]\s*(.*?)\s*$", alternatives))
            .map_err(|e| FixtureError::new(0, 0, format!("invalid marker prefix: {}", e)))?;
        Ok(MarkerSyntax { pattern })
    }

    /// Match the text of a line comment (without the leading `//`)
    ///
    /// Returns `None` for ordinary comments, and an error for a marker naming
    /// an unknown diagnostic kind.
    pub fn recognize(&self, text: &str) -> Option<Result<(DiagnosticKind, String), String>> {
        let captures = self.pattern.captures(text)?;
        let kind = captures.get(1).map_or("", |m| m.as_str());
        let note = captures.get(2).map_or("", |m| m.as_str()).to_string();
        Some(
            kind.parse::<DiagnosticKind>()
                .map(|k| (k, note))
                .map_err(|e| e.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognizes_default_prefix() {
        let syntax = MarkerSyntax::new(&[DEFAULT_PREFIX]).unwrap();
        assert_eq!(
            syntax.recognize(" $ExpectError[extra-arg] too many"),
            Some(Ok((DiagnosticKind::ExtraArg, "too many".to_string())))
        );
        assert_eq!(syntax.recognize(" just a comment"), None);
    }

    #[test]
    fn test_custom_prefixes_are_escaped() {
        let syntax = MarkerSyntax::new(&["$FlowExpectedError", "@expect"]).unwrap();
        assert!(matches!(
            syntax.recognize(" $FlowExpectedError[prop-missing]"),
            Some(Ok((DiagnosticKind::PropMissing, _)))
        ));
        assert!(matches!(
            syntax.recognize(" @expect[unsafe-addition]"),
            Some(Ok((DiagnosticKind::UnsafeAddition, _)))
        ));
        assert_eq!(syntax.recognize(" XFlowExpectedError[prop-missing]"), None);
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let syntax = MarkerSyntax::new(&[DEFAULT_PREFIX]).unwrap();
        assert!(matches!(syntax.recognize(" $ExpectError[bogus]"), Some(Err(_))));
    }
}
