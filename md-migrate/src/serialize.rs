//! Markdown reconstruction for units whose renderings diverge.

use markdown::mdast::Node;
use thiserror::Error;

/// Errors the serializer can report.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("markdown parse failed: {0}")]
    Parse(String),
    #[error("node has no source position to fall back on")]
    MissingPosition,
}

/// Rewrites a markdown unit in the replacement engine's canonical spelling.
pub trait TokenSerializer: Send + Sync {
    fn serialize(&self, source: &str) -> Result<String, SerializeError>;
}

/// Serializer that parses with the replacement engine and writes its syntax tree back out.
///
/// Node kinds without a writer keep their original source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MdastSerializer;

impl TokenSerializer for MdastSerializer {
    fn serialize(&self, source: &str) -> Result<String, SerializeError> {
        let root = markdown::to_mdast(source, &markdown::ParseOptions::gfm())
            .map_err(|err| SerializeError::Parse(err.reason))?;
        let writer = Writer { source };
        let children = root.children().map_or(&[][..], Vec::as_slice);
        writer.blocks(children, "\n\n")
    }
}

struct Writer<'s> {
    source: &'s str,
}

impl Writer<'_> {
    fn blocks(&self, nodes: &[Node], separator: &str) -> Result<String, SerializeError> {
        let mut parts = Vec::with_capacity(nodes.len());
        for node in nodes {
            parts.push(self.block(node)?);
        }
        Ok(parts.join(separator))
    }

    fn block(&self, node: &Node) -> Result<String, SerializeError> {
        Ok(match node {
            Node::Paragraph(paragraph) => self.inline(&paragraph.children)?,
            Node::Heading(heading) => format!(
                "{} {}",
                "#".repeat(usize::from(heading.depth)),
                self.inline(&heading.children)?
            ),
            Node::ThematicBreak(_) => "---".to_string(),
            Node::Code(code) => {
                let fence = "`".repeat(longest_run(&code.value, '`').max(2) + 1);
                let info = [code.lang.as_deref(), code.meta.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{fence}{info}\n{}\n{fence}", code.value)
            }
            Node::Blockquote(quote) => {
                prefix_lines(&self.blocks(&quote.children, "\n\n")?, "> ", ">")
            }
            Node::List(list) => {
                let mut items = Vec::with_capacity(list.children.len());
                let mut number = list.start.unwrap_or(1);
                for child in &list.children {
                    let Node::ListItem(item) = child else {
                        items.push(self.block(child)?);
                        continue;
                    };
                    let marker = if list.ordered {
                        let marker = format!("{number}.");
                        number += 1;
                        marker
                    } else {
                        "-".to_string()
                    };
                    let separator = if item.spread { "\n\n" } else { "\n" };
                    let mut body = self.blocks(&item.children, separator)?;
                    match item.checked {
                        Some(true) => body.insert_str(0, "[x] "),
                        Some(false) => body.insert_str(0, "[ ] "),
                        None => {}
                    }
                    let indent = " ".repeat(marker.len() + 1);
                    items.push(format!("{marker} {}", prefix_continuation(&body, &indent)));
                }
                items.join(if list.spread { "\n\n" } else { "\n" })
            }
            Node::Html(html) => html.value.clone(),
            other => self.original(other)?,
        })
    }

    fn inline(&self, nodes: &[Node]) -> Result<String, SerializeError> {
        let mut out = String::new();
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(&escape_text(&text.value)),
                Node::Emphasis(em) => {
                    out.push('*');
                    out.push_str(&self.inline(&em.children)?);
                    out.push('*');
                }
                Node::Strong(strong) => {
                    out.push_str("**");
                    out.push_str(&self.inline(&strong.children)?);
                    out.push_str("**");
                }
                Node::Delete(del) => {
                    out.push_str("~~");
                    out.push_str(&self.inline(&del.children)?);
                    out.push_str("~~");
                }
                Node::InlineCode(code) => out.push_str(&inline_code(&code.value)),
                Node::Break(_) => out.push_str("\\\n"),
                Node::Link(link) => {
                    let is_autolink = matches!(
                        link.children.as_slice(),
                        [Node::Text(text)] if text.value == link.url
                    );
                    if is_autolink && link.title.is_none() {
                        out.push_str(&format!("<{}>", link.url));
                    } else {
                        out.push('[');
                        out.push_str(&self.inline(&link.children)?);
                        out.push_str("](");
                        out.push_str(&destination(&link.url, link.title.as_deref()));
                        out.push(')');
                    }
                }
                Node::Image(image) => {
                    out.push_str("![");
                    out.push_str(&escape_text(&image.alt));
                    out.push_str("](");
                    out.push_str(&destination(&image.url, image.title.as_deref()));
                    out.push(')');
                }
                Node::Html(html) => out.push_str(&html.value),
                other => out.push_str(&self.original(other)?),
            }
        }
        Ok(out)
    }

    fn original(&self, node: &Node) -> Result<String, SerializeError> {
        let position = node.position().ok_or(SerializeError::MissingPosition)?;
        self.source
            .get(position.start.offset..position.end.offset)
            .map(|text| text.trim_end().to_string())
            .ok_or(SerializeError::MissingPosition)
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn inline_code(value: &str) -> String {
    let fence = "`".repeat(longest_run(value, '`') + 1);
    if value.starts_with('`') || value.ends_with('`') {
        format!("{fence} {value} {fence}")
    } else {
        format!("{fence}{value}{fence}")
    }
}

fn destination(url: &str, title: Option<&str>) -> String {
    let url = if url.is_empty() || url.contains([' ', '(', ')']) {
        format!("<{url}>")
    } else {
        url.to_string()
    };
    match title {
        Some(title) => format!("{url} \"{}\"", title.replace('"', "\\\"")),
        None => url,
    }
}

fn longest_run(text: &str, needle: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == needle {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn prefix_lines(text: &str, prefix: &str, empty: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                empty.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn prefix_continuation(text: &str, indent: &str) -> String {
    let mut lines = text.lines();
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{MdastSerializer, TokenSerializer};

    fn serialize(source: &str) -> String {
        MdastSerializer.serialize(source).expect("serialize")
    }

    #[test]
    fn rewrites_emphasis_spelling() {
        assert_eq!(serialize("__bold__ and _em_\n"), "**bold** and *em*");
    }

    #[test]
    fn setext_heading_becomes_atx() {
        assert_eq!(serialize("Title\n=====\n"), "# Title");
    }

    #[test]
    fn lists_keep_numbering_and_nesting() {
        assert_eq!(serialize("3) one\n4) two\n"), "3. one\n4. two");
        assert_eq!(serialize("* a\n  * b\n"), "- a\n  - b");
    }

    #[test]
    fn code_and_links() {
        assert_eq!(
            serialize("~~~rust\nfn main() {}\n~~~\n"),
            "```rust\nfn main() {}\n```"
        );
        assert_eq!(
            serialize("[docs](https://example.com \"Docs\")\n"),
            "[docs](https://example.com \"Docs\")"
        );
        assert_eq!(serialize("<https://example.com>\n"), "<https://example.com>");
    }

    #[test]
    fn tables_fall_back_to_source() {
        let table = "| a | b |\n|---|---|\n| 1 | 2 |";
        assert_eq!(serialize(table), table);
    }
}
