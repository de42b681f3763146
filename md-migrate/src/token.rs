//! Top-level block tokens of a markdown document.

use std::fmt::{self, Display, Formatter};
use std::ops::Range;

use pulldown_cmark::{Event, Parser, Tag};

use crate::render::legacy_options;

/// Block construct a token was parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Paragraph,
    Heading,
    BlockQuote,
    CodeBlock,
    HtmlBlock,
    List,
    Table,
    ThematicBreak,
    FootnoteDefinition,
    MetadataBlock,
    /// The whole document, used when migrating file by file.
    Document,
    Other,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::BlockQuote => "blockquote",
            Self::CodeBlock => "code_block",
            Self::HtmlBlock => "html_block",
            Self::List => "list",
            Self::Table => "table",
            Self::ThematicBreak => "thematic_break",
            Self::FootnoteDefinition => "footnote_definition",
            Self::MetadataBlock => "metadata_block",
            Self::Document => "document",
            Self::Other => "other",
        }
    }

    fn from_tag(tag: &Tag<'_>) -> Self {
        match tag {
            Tag::Paragraph => Self::Paragraph,
            Tag::Heading { .. } => Self::Heading,
            Tag::BlockQuote(_) => Self::BlockQuote,
            Tag::CodeBlock(_) => Self::CodeBlock,
            Tag::HtmlBlock => Self::HtmlBlock,
            Tag::List(_) => Self::List,
            Tag::Table(_) => Self::Table,
            Tag::FootnoteDefinition(_) => Self::FootnoteDefinition,
            Tag::MetadataBlock(_) => Self::MetadataBlock,
            _ => Self::Other,
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One top-level block: its kind, first line (1-based) and byte range in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub range: Range<usize>,
}

/// Split `markdown` into its top-level blocks in document order.
///
/// Bytes outside every token (blank lines, link reference definitions) belong to no token.
pub fn tokenize(markdown: &str) -> Vec<Token> {
    let lines = LineIndex::new(markdown);
    let mut tokens: Vec<Token> = Vec::new();
    let mut depth = 0usize;

    for (event, range) in Parser::new_ext(markdown, legacy_options()).into_offset_iter() {
        let kind = match &event {
            Event::Start(tag) => {
                depth += 1;
                if depth > 1 {
                    continue;
                }
                TokenKind::from_tag(tag)
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                continue;
            }
            Event::Rule if depth == 0 => TokenKind::ThematicBreak,
            _ => continue,
        };

        let start = tokens.last().map_or(0, |last| last.range.end);
        if range.start < start {
            continue;
        }
        tokens.push(Token {
            kind,
            line: lines.line_of(range.start),
            range,
        });
    }
    tokens
}

/// Byte offset to 1-based line lookup.
#[derive(Debug, Clone)]
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(at, _)| at + 1));
        Self { starts }
    }

    pub(crate) fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }

    /// Last line a range touches, ignoring a trailing newline.
    pub(crate) fn last_line(&self, range: &Range<usize>) -> usize {
        let end = if range.end > range.start {
            range.end - 1
        } else {
            range.start
        };
        self.line_of(end)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{tokenize, LineIndex, TokenKind};

    #[test]
    fn blocks_come_out_in_document_order() {
        let source = "# Title\nalpha\n\n---\nbeta\n\n- a\n- b\n\n```\ncode\n```\n";
        let tokens = tokenize(source);
        let summary: Vec<_> = tokens.iter().map(|t| (t.kind, t.line)).collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::Heading, 1),
                (TokenKind::Paragraph, 2),
                (TokenKind::ThematicBreak, 4),
                (TokenKind::Paragraph, 5),
                (TokenKind::List, 7),
                (TokenKind::CodeBlock, 10),
            ]
        );
        assert!(source[tokens[1].range.clone()].starts_with("alpha"));
        assert!(source[tokens[4].range.clone()].contains("- b"));
    }

    #[test]
    fn nested_blocks_stay_inside_their_container() {
        let tokens = tokenize("> quoted\n>\n> - item\n\nafter\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::BlockQuote);
        assert_eq!(tokens[1].line, 5);
    }

    #[test]
    fn reference_definitions_fall_between_tokens() {
        let source = "[home]: https://example.com\n\nsee [home]\n";
        let tokens = tokenize(source);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn line_index_is_one_based() {
        let index = LineIndex::new("a\nbb\nccc");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.last_line(&(2..5)), 2);
    }
}
