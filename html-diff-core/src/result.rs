use serde::Serialize;

use crate::compare::{Comparator, Comparison, Divergence};
use crate::span::SourceSpan;

/// Outcome category of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Equivalent,
    Divergent,
}

/// One comparison outcome for a rendered file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// File identifier (usually a path relative to the compared roots).
    pub file: String,
    pub first_html: String,
    pub second_html: String,
    /// Markdown lines of the first divergence, when the first side carries provenance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
    pub status: DiffStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<Divergence>,
}

impl DiffResult {
    pub fn is_equivalent(&self) -> bool {
        self.status == DiffStatus::Equivalent
    }
}

/// Compare two rendered fragments of the same file.
pub fn diff_html(
    file: impl Into<String>,
    first_html: &str,
    second_html: &str,
    comparator: &Comparator<'_>,
) -> DiffResult {
    let comparison = comparator.compare(first_html, second_html);
    let (status, divergence) = match comparison {
        Comparison::Equivalent => (DiffStatus::Equivalent, None),
        Comparison::Divergent(divergence) => (DiffStatus::Divergent, Some(divergence)),
    };
    DiffResult {
        file: file.into(),
        first_html: first_html.to_string(),
        second_html: second_html.to_string(),
        span: divergence.as_ref().and_then(|d| d.span),
        status,
        divergence,
    }
}

#[cfg(test)]
mod tests {
    use super::{diff_html, DiffStatus};
    use crate::compare::Comparator;
    use crate::rules::default_rules;
    use crate::span::SourceSpan;

    #[test]
    fn divergent_result_carries_span_and_inputs() {
        let rules = default_rules();
        let comparator = Comparator::new(&rules);
        let first = r#"<p sourcestartlinenumber="7" sourceendlinenumber="7">alpha</p>"#;
        let second = "<p>beta</p>";

        let result = diff_html("docs/a.html", first, second, &comparator);
        assert_eq!(result.status, DiffStatus::Divergent);
        assert_eq!(result.span, Some(SourceSpan::new(7, 7)));
        assert_eq!(result.first_html, first);
        assert!(result.divergence.is_some());
    }

    #[test]
    fn equivalent_result_has_no_span() {
        let rules = default_rules();
        let comparator = Comparator::new(&rules);
        let result = diff_html("b.html", "<p>x</p>", "<p>x</p>\n", &comparator);
        assert!(result.is_equivalent());
        assert_eq!(result.span, None);
    }
}
