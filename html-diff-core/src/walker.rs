use crate::rules::{Rule, RuleTable};
use crate::span::SourceSpan;
use crate::tree::{HtmlTree, NodeId};

/// Lazily produces the comparable nodes of one tree.
///
/// Pending nodes live on an explicit stack. [`push`](Self::push) lays down a node and its
/// leftmost descendants, so [`pop`](Self::pop) always yields the deepest pending node: a node
/// surfaces only after every child it has was handed out. Ignored nodes and their subtrees
/// never reach the stack.
#[derive(Debug)]
pub struct TreeWalker<'r> {
    tree: HtmlTree,
    rules: &'r RuleTable,
    stack: Vec<NodeId>,
}

impl<'r> TreeWalker<'r> {
    /// Take ownership of `tree` and push its first top-level node.
    pub fn new(tree: HtmlTree, rules: &'r RuleTable) -> Self {
        let first = tree.first_child(tree.root());
        let mut walker = Self {
            tree,
            rules,
            stack: Vec::new(),
        };
        walker.push(first);
        walker
    }

    pub fn tree(&self) -> &HtmlTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut HtmlTree {
        &mut self.tree
    }

    pub fn rule_for(&self, id: NodeId) -> Option<&'r Rule> {
        let rules = self.rules;
        rules.lookup(self.tree.node_name(id))
    }

    /// Number of nodes still waiting on the stack.
    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    /// Push `node` and its first-child chain, moving to the next sibling past ignored nodes.
    pub fn push(&mut self, node: Option<NodeId>) {
        let mut current = node;
        while let Some(id) = current {
            let rule = self.rule_for(id);
            if rule.is_some_and(|rule| rule.is_ignore(&self.tree, id)) {
                current = self.tree.next_sibling(id);
                continue;
            }
            if let Some(rule) = rule {
                if rule.has_process() && !self.tree.is_processed(id) {
                    rule.process(&mut self.tree, id);
                    self.tree.mark_processed(id);
                }
            }
            self.stack.push(id);
            current = self.tree.first_child(id);
        }
    }

    pub fn pop(&mut self) -> Option<NodeId> {
        self.stack.pop()
    }

    /// Advance past `current`, which has already been matched.
    pub fn next(&mut self, current: NodeId) -> Option<NodeId> {
        let sibling = self.tree.next_sibling(current);
        self.push(sibling);
        self.pop()
    }

    /// Skip transparent nodes; their children were already handed out.
    pub fn compare_node(&mut self, node: Option<NodeId>) -> Option<NodeId> {
        let mut current = node;
        while let Some(id) = current {
            let transparent = self
                .rule_for(id)
                .is_some_and(|rule| rule.is_compare_children_only(&self.tree, id));
            if !transparent {
                break;
            }
            current = self.next(id);
        }
        current
    }

    /// Drain the stack until an enclosing node with line provenance turns up.
    pub fn span_from_stack(&mut self) -> Option<SourceSpan> {
        while let Some(id) = self.stack.pop() {
            if let Some(span) = self.tree.source_span(id) {
                return Some(span);
            }
        }
        None
    }
}
