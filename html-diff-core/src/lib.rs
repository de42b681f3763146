//! Semantic-equivalence diffing of rendered HTML fragments.

pub mod compare;
pub mod format;
pub mod normalize;
pub mod parser;
pub mod result;
pub mod rules;
pub mod span;
pub mod tree;
pub mod video;
pub mod walker;
pub mod xml;

pub use compare::{Comparator, CompareOptions, Comparison, Divergence, DivergenceReason};
pub use format::{format_json, format_summary, format_text};
pub use normalize::{collapse_whitespace, normalize_text, Pass, PassError, Pipeline};
pub use parser::parse_html;
pub use result::{diff_html, DiffResult, DiffStatus};
pub use rules::{default_rules, Rule, RuleTable};
pub use span::SourceSpan;
pub use tree::{HtmlTree, NodeData, NodeId};
pub use walker::TreeWalker;
pub use xml::{reformat_xml, ReformatError};
