use scraper::{Html, Node};

use crate::tree::{HtmlTree, NodeData};

/// Parse an HTML fragment into an [`HtmlTree`].
///
/// Parsing follows the HTML5 fragment algorithm, so malformed markup is repaired rather than
/// rejected. Comments, doctypes and processing instructions are dropped.
pub fn parse_html(html: &str) -> HtmlTree {
    let fragment = Html::parse_fragment(html);
    let mut tree = HtmlTree::new();
    let root = tree.root();

    let mut stack = Vec::new();
    for child in fragment.root_element().children().rev() {
        stack.push((child, root));
    }

    while let Some((node, parent)) = stack.pop() {
        let id = match node.value() {
            Node::Element(element) => {
                let mut data = NodeData::element(element.name());
                if let NodeData::Element { attributes, .. } = &mut data {
                    for (key, value) in element.attrs() {
                        attributes.insert(key.to_string(), value.to_string());
                    }
                }
                tree.append_child(parent, data)
            }
            Node::Text(text) => {
                let value: &str = text;
                tree.append_child(parent, NodeData::text(value));
                continue;
            }
            _ => continue,
        };

        for child in node.children().rev() {
            stack.push((child, id));
        }
    }

    tree
}
