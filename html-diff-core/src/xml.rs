use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use thiserror::Error;

const WRAPPER: &str = "html-diff-root";

/// Errors that can occur while re-serializing markup as indented XML.
#[derive(Debug, Error)]
pub enum ReformatError {
    /// Markup is not well-formed XML.
    #[error("failed to reformat XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Writer produced bytes that were not valid UTF-8.
    #[error("invalid UTF-8 in reformatted XML: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Pretty-print a markup fragment as XML with two-space indentation and `\n` line endings.
///
/// The fragment may contain several top-level nodes. Whitespace around text is trimmed and
/// comments, declarations and doctypes are dropped, so two fragments that differ only in
/// incidental layout produce the same output.
pub fn reformat_xml(markup: &str) -> Result<String, ReformatError> {
    let wrapped = format!("<{WRAPPER}>{markup}</{WRAPPER}>");
    let mut reader = Reader::from_reader(wrapped.as_bytes());
    reader.config_mut().trim_text(true);

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
            event => writer
                .write_event(event)
                .map_err(quick_xml::Error::from)?,
        }
        buf.clear();
    }

    let text = String::from_utf8(writer.into_inner())?;
    Ok(unwrap_fragment(&text))
}

fn unwrap_fragment(text: &str) -> String {
    let open = format!("<{WRAPPER}>");
    let close = format!("</{WRAPPER}>");
    let inner = text
        .trim()
        .strip_prefix(open.as_str())
        .and_then(|rest| rest.strip_suffix(close.as_str()))
        .unwrap_or(text);

    inner
        .trim_matches('\n')
        .lines()
        .map(|line| line.strip_prefix("  ").unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{reformat_xml, ReformatError};

    #[test]
    fn layout_differences_disappear() {
        let compact = reformat_xml("<ul><li>a</li><li>b</li></ul><p>c</p>").expect("compact");
        let spaced = reformat_xml("<ul>\n   <li> a </li>\n<li>b</li>\n</ul>\n\n<p>c\n</p>")
            .expect("spaced");
        assert_eq!(compact, spaced);
        assert_eq!(compact, "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n<p>c</p>");
    }

    #[test]
    fn unclosed_void_tag_is_rejected() {
        let err = reformat_xml("<p>a<br>b</p>").expect_err("should fail");
        assert!(matches!(err, ReformatError::Xml(_)));
    }

    #[test]
    fn empty_fragment_reformats_to_empty_string() {
        assert_eq!(reformat_xml("").expect("empty"), "");
    }
}
