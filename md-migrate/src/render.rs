//! The two markdown engines being compared.

use std::ops::Range;

use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use thiserror::Error;

use crate::resolve::{MapResolver, ResolveError, XrefResolver};
use crate::token::LineIndex;

/// Scheme marking a cross-reference autolink, e.g. `<xref:System.String>`.
pub const XREF_SCHEME: &str = "xref:";

/// Errors a renderer can report for one unit.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{engine} rejected the input: {reason}")]
    Rejected { engine: &'static str, reason: String },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Turns markdown into an HTML fragment.
pub trait MarkdownRenderer: Send + Sync {
    /// Short engine name used in logs and errors.
    fn name(&self) -> &'static str;

    fn render(&self, markdown: &str, file: &str) -> Result<String, RenderError>;
}

/// Parser options the legacy engine and the tokenizer share.
pub fn legacy_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS
}

/// CommonMark engine that annotates blocks with their markdown provenance.
///
/// Paragraphs, headings and list items carry `sourcefile`, `sourcestartlinenumber` and
/// `sourceendlinenumber`. `<xref:uid>` autolinks become `<xref>` elements resolved through the
/// injected resolver.
pub struct LegacyRenderer {
    resolver: Box<dyn XrefResolver>,
}

impl Default for LegacyRenderer {
    fn default() -> Self {
        Self::new(MapResolver::default())
    }
}

impl LegacyRenderer {
    pub fn new(resolver: impl XrefResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
        }
    }

    fn xref_open(&self, uid: &str) -> Result<String, RenderError> {
        let raw = format!("<{XREF_SCHEME}{uid}>");
        let mut tag = format!("<xref uid=\"{}\"", htmlize::escape_attribute(uid));
        if let Some(href) = self.resolver.resolve(uid)? {
            tag.push_str(&format!(" href=\"{}\"", htmlize::escape_attribute(href)));
        }
        tag.push_str(&format!(
            " data-raw-source=\"{}\">",
            htmlize::escape_attribute(raw)
        ));
        Ok(tag)
    }
}

impl MarkdownRenderer for LegacyRenderer {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn render(&self, markdown: &str, file: &str) -> Result<String, RenderError> {
        let lines = LineIndex::new(markdown);
        let provenance = |tag: &str, range: &Range<usize>| {
            format!(
                "<{tag} sourcefile=\"{}\" sourcestartlinenumber=\"{}\" sourceendlinenumber=\"{}\"",
                htmlize::escape_attribute(file),
                lines.line_of(range.start),
                lines.last_line(range)
            )
        };

        let mut links = Vec::new();
        let mut events = Vec::new();
        for (event, range) in Parser::new_ext(markdown, legacy_options()).into_offset_iter() {
            let event = match event {
                Event::Start(Tag::Paragraph) => html_event(provenance("p", &range) + ">"),
                Event::End(TagEnd::Paragraph) => html_event("</p>\n".to_string()),
                Event::Start(Tag::Heading {
                    level, id, classes, ..
                }) => {
                    let mut open = provenance(&level.to_string(), &range);
                    if let Some(id) = id {
                        open.push_str(&format!(" id=\"{}\"", htmlize::escape_attribute(&*id)));
                    }
                    if !classes.is_empty() {
                        let classes: Vec<&str> = classes.iter().map(|c| &**c).collect();
                        open.push_str(&format!(" class=\"{}\"", classes.join(" ")));
                    }
                    html_event(open + ">")
                }
                Event::End(TagEnd::Heading(level)) => html_event(format!("</{level}>\n")),
                Event::Start(Tag::Item) => html_event(provenance("li", &range) + ">"),
                Event::End(TagEnd::Item) => html_event("</li>\n".to_string()),
                Event::Start(Tag::Link {
                    link_type: LinkType::Autolink,
                    dest_url,
                    ..
                }) if dest_url.starts_with(XREF_SCHEME) => {
                    links.push(true);
                    html_event(self.xref_open(&dest_url[XREF_SCHEME.len()..])?)
                }
                Event::Start(tag @ Tag::Link { .. }) => {
                    links.push(false);
                    Event::Start(tag)
                }
                Event::End(TagEnd::Link) => {
                    if links.pop() == Some(true) {
                        html_event("</xref>".to_string())
                    } else {
                        Event::End(TagEnd::Link)
                    }
                }
                other => other,
            };
            events.push(event);
        }

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        Ok(out)
    }
}

fn html_event(markup: String) -> Event<'static> {
    Event::Html(CowStr::from(markup))
}

/// GFM engine producing plain HTML without provenance attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplacementRenderer;

impl ReplacementRenderer {
    fn options() -> markdown::Options {
        markdown::Options {
            parse: markdown::ParseOptions::gfm(),
            compile: markdown::CompileOptions {
                allow_dangerous_html: true,
                ..markdown::CompileOptions::gfm()
            },
        }
    }
}

impl MarkdownRenderer for ReplacementRenderer {
    fn name(&self) -> &'static str {
        "replacement"
    }

    fn render(&self, markdown: &str, _file: &str) -> Result<String, RenderError> {
        markdown::to_html_with_options(markdown, &Self::options()).map_err(|err| {
            RenderError::Rejected {
                engine: self.name(),
                reason: err.reason,
            }
        })
    }
}
