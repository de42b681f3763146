//! Lock-step structural comparison of two rendered fragments.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use tracing::debug;

use crate::normalize::{collapse_whitespace, Pipeline};
use crate::parser::parse_html;
use crate::rules::RuleTable;
use crate::span::SourceSpan;
use crate::tree::{HtmlTree, NodeId};
use crate::walker::TreeWalker;

/// Configures comparator behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOptions {
    /// Compare the attributes a rule lists in addition to tag names.
    pub compare_attributes: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            compare_attributes: true,
        }
    }
}

/// Why two fragments stopped matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DivergenceReason {
    /// The first fragment ran out of comparable nodes first.
    MissingFirst,
    /// The second fragment ran out of comparable nodes first.
    MissingSecond,
    TagMismatch {
        first: String,
        second: String,
    },
    AttributeMismatch {
        name: String,
    },
    TextMismatch,
}

impl Display for DivergenceReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFirst => write!(f, "first side ended early"),
            Self::MissingSecond => write!(f, "second side ended early"),
            Self::TagMismatch { first, second } => {
                write!(f, "tag mismatch: first='{first}' second='{second}'")
            }
            Self::AttributeMismatch { name } => write!(f, "attribute '{name}' differs"),
            Self::TextMismatch => write!(f, "text differs"),
        }
    }
}

/// The first mismatch found between two fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub reason: DivergenceReason,
    /// Markdown lines the mismatch traces back to, taken from the first fragment.
    pub span: Option<SourceSpan>,
    /// Content of the first side's current node.
    pub first: Option<String>,
    /// Content of the second side's current node.
    pub second: Option<String>,
}

/// Outcome of one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Equivalent,
    Divergent(Divergence),
}

impl Comparison {
    pub fn is_equivalent(&self) -> bool {
        matches!(self, Self::Equivalent)
    }

    pub fn divergence(&self) -> Option<&Divergence> {
        match self {
            Self::Equivalent => None,
            Self::Divergent(divergence) => Some(divergence),
        }
    }

    pub fn span(&self) -> Option<SourceSpan> {
        self.divergence().and_then(|d| d.span)
    }
}

/// Rule-driven semantic comparator.
///
/// Holds a borrowed [`RuleTable`], so one table can serve many comparators and threads.
#[derive(Debug)]
pub struct Comparator<'r> {
    rules: &'r RuleTable,
    options: CompareOptions,
    filter: Pipeline,
    tree_pipeline: Pipeline,
}

enum TextStep {
    Both,
    First,
    Second,
    Mismatch,
}

impl<'r> Comparator<'r> {
    pub fn new(rules: &'r RuleTable) -> Self {
        Self::with_options(rules, CompareOptions::default())
    }

    pub fn with_options(rules: &'r RuleTable, options: CompareOptions) -> Self {
        Self {
            rules,
            options,
            filter: Pipeline::standard(),
            tree_pipeline: Pipeline::preserving_provenance(),
        }
    }

    pub fn options(&self) -> CompareOptions {
        self.options
    }

    /// Normalize both fragments, short-circuit when they become identical, and otherwise
    /// walk their trees.
    pub fn compare(&self, first: &str, second: &str) -> Comparison {
        if self.filter.run(first) == self.filter.run(second) {
            return Comparison::Equivalent;
        }
        let first = self.tree_pipeline.run(first);
        let second = self.tree_pipeline.run(second);
        self.compare_trees(&first, &second)
    }

    /// Walk the trees of two fragments without string normalization.
    pub fn compare_trees(&self, first_html: &str, second_html: &str) -> Comparison {
        let mut first = TreeWalker::new(parse_html(first_html), self.rules);
        let mut second = TreeWalker::new(parse_html(second_html), self.rules);

        let mut a = first.pop();
        let mut b = second.pop();

        loop {
            a = first.compare_node(a);
            b = second.compare_node(b);

            let (a_id, b_id) = match (a, b) {
                (None, None) => return Comparison::Equivalent,
                (Some(_), None) => {
                    return diverge(&mut first, a, &second, b, DivergenceReason::MissingSecond)
                }
                (None, Some(_)) => {
                    return diverge(&mut first, a, &second, b, DivergenceReason::MissingFirst)
                }
                (Some(a_id), Some(b_id)) => (a_id, b_id),
            };

            let first_name = first.tree().node_name(a_id);
            let second_name = second.tree().node_name(b_id);
            if first_name != second_name {
                let reason = DivergenceReason::TagMismatch {
                    first: first_name.to_string(),
                    second: second_name.to_string(),
                };
                return diverge(&mut first, a, &second, b, reason);
            }

            if first.tree().is_text(a_id) {
                match align_text(first.tree_mut(), a_id, second.tree_mut(), b_id) {
                    TextStep::Both => {
                        a = first.next(a_id);
                        b = second.next(b_id);
                    }
                    TextStep::First => a = first.next(a_id),
                    TextStep::Second => b = second.next(b_id),
                    TextStep::Mismatch => {
                        return diverge(&mut first, a, &second, b, DivergenceReason::TextMismatch)
                    }
                }
                continue;
            }

            if self.options.compare_attributes {
                if let Some(name) = attribute_mismatch(&first, a_id, &second, b_id) {
                    let reason = DivergenceReason::AttributeMismatch { name };
                    return diverge(&mut first, a, &second, b, reason);
                }
            }

            a = first.next(a_id);
            b = second.next(b_id);
        }
    }
}

/// Match two text runs. Unequal lengths match when one is a prefix of the other: the shorter
/// side is consumed and the longer keeps the unmatched remainder for the next round.
fn align_text(first: &mut HtmlTree, a: NodeId, second: &mut HtmlTree, b: NodeId) -> TextStep {
    let left = collapse_whitespace(first.text(a).unwrap_or_default());
    let right = collapse_whitespace(second.text(b).unwrap_or_default());

    if left.len() == right.len() {
        return if left == right {
            TextStep::Both
        } else {
            TextStep::Mismatch
        };
    }

    if left.len() < right.len() {
        match right.strip_prefix(left.as_str()) {
            Some(rest) => {
                second.set_text(b, rest);
                TextStep::First
            }
            None => TextStep::Mismatch,
        }
    } else {
        match left.strip_prefix(right.as_str()) {
            Some(rest) => {
                first.set_text(a, rest);
                TextStep::Second
            }
            None => TextStep::Mismatch,
        }
    }
}

fn attribute_mismatch(
    first: &TreeWalker<'_>,
    a: NodeId,
    second: &TreeWalker<'_>,
    b: NodeId,
) -> Option<String> {
    let rule = first.rule_for(a)?;
    rule.attributes()
        .iter()
        .find(|name| first.tree().attr(a, name) != second.tree().attr(b, name))
        .cloned()
}

fn diverge(
    first: &mut TreeWalker<'_>,
    a: Option<NodeId>,
    second: &TreeWalker<'_>,
    b: Option<NodeId>,
    reason: DivergenceReason,
) -> Comparison {
    let span = a
        .and_then(|id| first.tree().source_span(id))
        .or_else(|| first.span_from_stack());
    let first_content = a.map(|id| first.tree().inner_html(id));
    let second_content = b.map(|id| second.tree().inner_html(id));
    debug!(%reason, span = ?span, "fragments diverge");
    Comparison::Divergent(Divergence {
        reason,
        span,
        first: first_content,
        second: second_content,
    })
}

#[cfg(test)]
mod tests {
    use super::{Comparator, CompareOptions, DivergenceReason};
    use crate::rules::{default_rules, Rule, RuleTable};

    #[test]
    fn longer_text_keeps_remainder_until_consumed() {
        let rules = default_rules();
        let comparator = Comparator::new(&rules);
        let result = comparator.compare_trees("<p>one two three</p>", "one <b>two</b> three");
        assert_eq!(
            result.divergence().map(|d| d.reason.clone()),
            Some(DivergenceReason::TagMismatch {
                first: "#text".to_string(),
                second: "b".to_string(),
            })
        );

        let split = comparator.compare_trees("<p>one two three</p>", "one <span>two three</span>");
        assert!(!split.is_equivalent());
        let joined = comparator.compare_trees("<p>one two three</p>", "one<br/>two three");
        assert!(joined.is_equivalent());
    }

    #[test]
    fn text_prefix_mismatch_diverges() {
        let rules = default_rules();
        let comparator = Comparator::new(&rules);
        let result = comparator.compare_trees("<p>Hello world</p>", "<p>Help</p>");
        assert_eq!(
            result.divergence().map(|d| d.reason.clone()),
            Some(DivergenceReason::TextMismatch)
        );
    }

    #[test]
    fn attribute_comparison_can_be_disabled() {
        let rules = RuleTable::empty().with_rule(Rule::new("img").compare_attributes(["src"]));
        let first = r#"<img src="a.png" id="x">"#;
        let second = r#"<img src="b.png" id="y">"#;

        let strict = Comparator::new(&rules).compare_trees(first, second);
        assert_eq!(
            strict.divergence().map(|d| d.reason.clone()),
            Some(DivergenceReason::AttributeMismatch {
                name: "src".to_string(),
            })
        );

        let lenient = Comparator::with_options(
            &rules,
            CompareOptions {
                compare_attributes: false,
            },
        )
        .compare_trees(first, second);
        assert!(lenient.is_equivalent());
    }

    #[test]
    fn unlisted_attributes_are_irrelevant() {
        let rules = default_rules();
        let comparator = Comparator::new(&rules);
        let result = comparator.compare_trees(
            r#"<h2 id="intro">Intro</h2>"#,
            r#"<h2 id="1-intro">Intro</h2>"#,
        );
        assert!(result.is_equivalent());
    }

    #[test]
    fn escaped_markup_text_is_not_decoded_again() {
        let rules = default_rules();
        let comparator = Comparator::new(&rules);
        let result = comparator.compare_trees("<p>&amp;lt;b&amp;gt;</p>", "<p>&lt;b&gt;</p>");
        assert_eq!(
            result.divergence().map(|d| d.reason.clone()),
            Some(DivergenceReason::TextMismatch)
        );
        assert!(comparator
            .compare_trees("<p>a &amp; b</p>", "<p>a &#38; b</p>")
            .is_equivalent());
    }

    #[test]
    fn extra_node_on_one_side_diverges() {
        let rules = default_rules();
        let comparator = Comparator::new(&rules);
        let result = comparator.compare_trees("<ul><li>a</li></ul>", "<ul><li>a</li></ul><hr>");
        assert_eq!(
            result.divergence().map(|d| d.reason.clone()),
            Some(DivergenceReason::MissingFirst)
        );
    }
}
