//! Per-tag comparison rules.
//!
//! A [`RuleTable`] maps a node name (tag name, or `#text` for text nodes) to at most one
//! [`Rule`]. Nodes without a rule are compared by name and then descended into normally.
//! Tables are built once and only read afterwards, so one table can back any number of
//! concurrent comparisons.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use crate::tree::{HtmlTree, NodeData, NodeId, TEXT_NODE_NAME};
use crate::video::canonical_embed_url;

/// Attribute carrying the markdown a cross-reference was written as.
pub const RAW_SOURCE_ATTR: &str = "data-raw-source";

const QUOTED_XREF_MARKERS: &[&str] = &["@\"", "@'"];

pub type NodePredicate = Box<dyn Fn(&HtmlTree, NodeId) -> bool + Send + Sync>;
pub type NodeProcess = Box<dyn Fn(&mut HtmlTree, NodeId) + Send + Sync>;

/// How nodes of one tag are treated during comparison.
pub struct Rule {
    tag: String,
    ignore: Option<NodePredicate>,
    compare_children_only: Option<NodePredicate>,
    process: Option<NodeProcess>,
    compare_attributes: Vec<String>,
}

impl Rule {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ignore: None,
            compare_children_only: None,
            process: None,
            compare_attributes: Vec::new(),
        }
    }

    /// Skip matching nodes together with their whole subtree.
    pub fn ignore_when(
        mut self,
        predicate: impl Fn(&HtmlTree, NodeId) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.ignore = Some(Box::new(predicate));
        self
    }

    /// Never compare matching nodes themselves; only their children take part.
    pub fn children_only_when(
        mut self,
        predicate: impl Fn(&HtmlTree, NodeId) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.compare_children_only = Some(Box::new(predicate));
        self
    }

    pub fn children_only(self) -> Self {
        self.children_only_when(|_, _| true)
    }

    /// Rewrite the node before it is pushed for comparison.
    ///
    /// The walker runs the mutator at most once per node.
    pub fn process_with(
        mut self,
        process: impl Fn(&mut HtmlTree, NodeId) + Send + Sync + 'static,
    ) -> Self {
        self.process = Some(Box::new(process));
        self
    }

    /// Restrict attribute comparison to `names`; every other attribute is irrelevant.
    pub fn compare_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.compare_attributes.contains(&name) {
                self.compare_attributes.push(name);
            }
        }
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_ignore(&self, tree: &HtmlTree, id: NodeId) -> bool {
        self.ignore.as_ref().is_some_and(|pred| pred(tree, id))
    }

    pub fn is_compare_children_only(&self, tree: &HtmlTree, id: NodeId) -> bool {
        self.compare_children_only
            .as_ref()
            .is_some_and(|pred| pred(tree, id))
    }

    pub fn has_process(&self) -> bool {
        self.process.is_some()
    }

    pub fn process(&self, tree: &mut HtmlTree, id: NodeId) {
        if let Some(process) = &self.process {
            process(tree, id);
        }
    }

    pub fn attributes(&self) -> &[String] {
        &self.compare_attributes
    }
}

impl Debug for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("tag", &self.tag)
            .field("ignore", &self.ignore.is_some())
            .field("compare_children_only", &self.compare_children_only.is_some())
            .field("process", &self.process.is_some())
            .field("compare_attributes", &self.compare_attributes)
            .finish()
    }
}

/// Lookup table from node name to [`Rule`].
#[derive(Debug)]
pub struct RuleTable {
    rules: HashMap<String, Rule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        default_rules()
    }
}

impl RuleTable {
    /// An empty table: every node is compared normally.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Add a rule, replacing any previous rule for the same tag.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.insert(rule);
        self
    }

    pub fn insert(&mut self, rule: Rule) -> Option<Rule> {
        self.rules.insert(rule.tag.clone(), rule)
    }

    pub fn lookup(&self, tag: &str) -> Option<&Rule> {
        self.rules.get(tag)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The curated rule catalog for comparing legacy and replacement renderer output.
pub fn default_rules() -> RuleTable {
    let mut table = RuleTable::empty()
        .with_rule(Rule::new(TEXT_NODE_NAME).ignore_when(is_blank_text))
        .with_rule(Rule::new("p").children_only())
        .with_rule(Rule::new("a").children_only())
        .with_rule(Rule::new("pre").children_only())
        // A hard break only splits a text run; text realignment joins the halves again.
        .with_rule(Rule::new("br").children_only())
        .with_rule(delimited("em", "*"))
        .with_rule(delimited("strong", "**"))
        .with_rule(delimited("del", "~~"))
        .with_rule(delimited("s", "~~"))
        .with_rule(delimited("strike", "~~"))
        .with_rule(Rule::new("img").compare_attributes(["src", "alt"]))
        .with_rule(Rule::new("video").compare_attributes(["src"]))
        .with_rule(
            Rule::new("iframe")
                .compare_attributes(["src"])
                .process_with(canonicalize_embed_src),
        )
        .with_rule(Rule::new("td").compare_attributes(["style", "align"]))
        .with_rule(Rule::new("th").compare_attributes(["style", "align"]))
        .with_rule(
            Rule::new("xref")
                .children_only_when(|tree, id| quoted_raw_source(tree, id).is_none())
                .process_with(substitute_raw_source),
        );

    // Heading ids are generated and differ between engines; explicit classes do not.
    for level in 1..=6 {
        table.insert(Rule::new(format!("h{level}")).compare_attributes(["class"]));
    }
    table
}

fn is_blank_text(tree: &HtmlTree, id: NodeId) -> bool {
    tree.text(id).is_some_and(|text| text.trim().is_empty())
}

/// Flatten an inline element to its markdown spelling: `<strong>x</strong>` reads as `**x**`.
fn delimited(tag: &str, delimiter: &'static str) -> Rule {
    Rule::new(tag)
        .children_only()
        .process_with(move |tree, id| {
            tree.prepend_child(id, NodeData::text(delimiter));
            tree.append_child(id, NodeData::text(delimiter));
        })
}

fn canonicalize_embed_src(tree: &mut HtmlTree, id: NodeId) {
    let Some(src) = tree.attr(id, "src") else {
        return;
    };
    let canonical = canonical_embed_url(src);
    if canonical != src {
        let canonical = canonical.into_owned();
        tree.set_attr(id, "src", canonical);
    }
}

fn quoted_raw_source(tree: &HtmlTree, id: NodeId) -> Option<&str> {
    tree.attr(id, RAW_SOURCE_ATTR)
        .filter(|raw| QUOTED_XREF_MARKERS.iter().any(|marker| raw.starts_with(marker)))
}

fn substitute_raw_source(tree: &mut HtmlTree, id: NodeId) {
    let Some(raw) = quoted_raw_source(tree, id).map(str::to_string) else {
        return;
    };
    tree.clear_children(id);
    tree.append_child(id, NodeData::text(raw));
}
