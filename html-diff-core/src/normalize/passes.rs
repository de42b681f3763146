//! Individual normalization passes. Each is a pure `&str -> String` transform.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::PassError;
use crate::rules::RAW_SOURCE_ATTR;
use crate::video::canonical_embed_url;
use crate::xml::reformat_xml;

/// Attributes that exist only for diagnostics and never carry rendering meaning.
const RENDER_ATTRIBUTES: &[&str] = &["sourcefile", "data-throw-if-not-resolved", "nocheck"];

/// Attributes that record where markup came from.
const PROVENANCE_ATTRIBUTES: &[&str] = &[
    "sourcestartlinenumber",
    "sourceendlinenumber",
    RAW_SOURCE_ATTR,
];

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("COMMENT_RE: hardcoded regex is valid"));

static XREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<xref\b([^>]*?)(?:/>|>(.*?)</xref>)")
        .expect("XREF_RE: hardcoded regex is valid")
});

static OPEN_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([a-zA-Z][\w:-]*)(\s[^<>]*?)?(/?)>").expect("OPEN_TAG_RE: hardcoded regex is valid")
});

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+([\w:.-]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("ATTRIBUTE_RE: hardcoded regex is valid")
});

static EMPTY_PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<p\b[^>]*>\s*(?:&lt;|&gt;)?\s*</p>")
        .expect("EMPTY_PARAGRAPH_RE: hardcoded regex is valid")
});

static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(<(?:ul|ol)\b[^>]*>|</(?:ul|ol)>|<(br|hr|img)\b([^>]*?)\s*/?>)\s*")
        .expect("BLOCK_TAG_RE: hardcoded regex is valid")
});

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<pre\b[^>]*>\s*)?<code\b([^>]*)>(.*?)</code>")
        .expect("CODE_RE: hardcoded regex is valid")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE: hardcoded regex is valid"));

static CONTAINER_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(p|li|h[1-6])\b([^>]*)>\s+").expect("CONTAINER_OPEN_RE: hardcoded regex is valid")
});

static CONTAINER_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+</(p|li|h[1-6])>").expect("CONTAINER_CLOSE_RE: hardcoded regex is valid")
});

static ALIGN_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)style\s*=\s*"\s*text-align\s*:\s*(left|right|center)\s*;?\s*""#)
        .expect("ALIGN_STYLE_RE: hardcoded regex is valid")
});

static ALIGN_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<(td|th)\b([^>]*?)\salign\s*=\s*"(left|right|center)"([^>]*)>"#)
        .expect("ALIGN_ATTR_RE: hardcoded regex is valid")
});

static IFRAME_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(<iframe\b[^>]*?\bsrc\s*=\s*")([^"]*)(")"#)
        .expect("IFRAME_SRC_RE: hardcoded regex is valid")
});

pub fn strip_comments(html: &str) -> Result<String, PassError> {
    Ok(COMMENT_RE.replace_all(html, "").into_owned())
}

/// Replace `<xref>` elements that have no resolved `href` with their raw markdown.
///
/// An autolink source such as `<xref:Uid>` collapses to its link text `xref:Uid`, the text an
/// engine without cross-reference support shows for the same autolink.
pub fn collapse_unresolved_xrefs(html: &str) -> Result<String, PassError> {
    let out = XREF_RE.replace_all(html, |caps: &Captures<'_>| {
        let attributes = caps.get(1).map_or("", |m| m.as_str());
        let resolved = attribute_value(attributes, "href").is_some_and(|href| !href.trim().is_empty());
        if resolved {
            return caps[0].to_string();
        }
        match attribute_value(attributes, RAW_SOURCE_ATTR) {
            Some(raw) => {
                let raw = htmlize::unescape(raw);
                let text = raw
                    .strip_prefix('<')
                    .and_then(|rest| rest.strip_suffix('>'))
                    .unwrap_or(&*raw);
                htmlize::escape_text(text).into_owned()
            }
            None => caps.get(2).map_or("", |m| m.as_str()).to_string(),
        }
    });
    Ok(out.into_owned())
}

/// Remove every renderer-injected attribute, provenance included.
pub fn strip_diagnostic_attributes(html: &str) -> Result<String, PassError> {
    Ok(strip_attributes(html, |name| {
        RENDER_ATTRIBUTES.contains(&name) || PROVENANCE_ATTRIBUTES.contains(&name)
    }))
}

/// Remove renderer-injected attributes but keep line ranges and raw markdown source.
pub fn strip_render_attributes(html: &str) -> Result<String, PassError> {
    Ok(strip_attributes(html, |name| RENDER_ATTRIBUTES.contains(&name)))
}

pub fn remove_empty_paragraphs(html: &str) -> Result<String, PassError> {
    Ok(EMPTY_PARAGRAPH_RE.replace_all(html, "").into_owned())
}

/// Put list delimiters and void block tags on their own line, in self-closed form.
pub fn normalize_block_whitespace(html: &str) -> Result<String, PassError> {
    let out = BLOCK_TAG_RE.replace_all(html, |caps: &Captures<'_>| match caps.get(2) {
        Some(void_tag) => {
            let attributes = caps.get(3).map_or("", |m| m.as_str()).trim_end();
            format!("\n<{}{attributes}/>\n", void_tag.as_str().to_ascii_lowercase())
        }
        None => format!("\n{}\n", &caps[1]),
    });
    Ok(out.into_owned())
}

/// Collapse whitespace inside inline `<code>`; code blocks under `<pre>` keep theirs.
pub fn collapse_inline_code(html: &str) -> Result<String, PassError> {
    let out = CODE_RE.replace_all(html, |caps: &Captures<'_>| {
        if caps.get(1).is_some() {
            return caps[0].to_string();
        }
        let body = WHITESPACE_RE.replace_all(&caps[3], " ");
        format!("<code{}>{body}</code>", &caps[2])
    });
    Ok(out.into_owned())
}

pub fn trim_block_containers(html: &str) -> Result<String, PassError> {
    let opened = CONTAINER_OPEN_RE.replace_all(html, "<$1$2>");
    Ok(CONTAINER_CLOSE_RE.replace_all(&opened, "</$1>").into_owned())
}

/// Spell table-cell alignment one way: `style="text-align: right;"`.
pub fn canonicalize_alignment(html: &str) -> Result<String, PassError> {
    let from_attr = ALIGN_ATTR_RE.replace_all(html, |caps: &Captures<'_>| {
        format!(
            "<{}{} style=\"text-align: {}\"{}>",
            &caps[1],
            &caps[2],
            caps[3].to_ascii_lowercase(),
            &caps[4]
        )
    });
    let out = ALIGN_STYLE_RE.replace_all(&from_attr, |caps: &Captures<'_>| {
        format!("style=\"text-align: {};\"", caps[1].to_ascii_lowercase())
    });
    Ok(out.into_owned())
}

pub fn canonicalize_video_urls(html: &str) -> Result<String, PassError> {
    let out = IFRAME_SRC_RE.replace_all(html, |caps: &Captures<'_>| {
        format!("{}{}{}", &caps[1], canonical_embed_url(&caps[2]), &caps[3])
    });
    Ok(out.into_owned())
}

/// Decode character references outside `<code>`/`<pre>`, re-escaping only what XML needs.
pub fn decode_entities(html: &str) -> Result<String, PassError> {
    let mut out = String::with_capacity(html.len());
    let mut code_depth = 0usize;
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        let (text, tail) = rest.split_at(start);
        push_text(&mut out, text, code_depth);

        let starts_tag = tail[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!');
        if !starts_tag {
            out.push_str(if code_depth > 0 { "<" } else { "&lt;" });
            rest = &tail[1..];
            continue;
        }

        let end = tag_end(tail).unwrap_or(tail.len());
        let tag = &tail[..end];
        code_depth = track_code_depth(tag, code_depth);
        out.push_str(tag);
        rest = &tail[end..];
    }
    push_text(&mut out, rest, code_depth);
    Ok(out)
}

pub fn reformat(html: &str) -> Result<String, PassError> {
    Ok(reformat_xml(html)?)
}

fn strip_attributes(html: &str, should_drop: impl Fn(&str) -> bool) -> String {
    OPEN_TAG_RE
        .replace_all(html, |caps: &Captures<'_>| {
            let Some(attributes) = caps.get(2) else {
                return caps[0].to_string();
            };
            let kept = ATTRIBUTE_RE.replace_all(attributes.as_str(), |attr: &Captures<'_>| {
                if should_drop(attr[1].to_ascii_lowercase().as_str()) {
                    String::new()
                } else {
                    attr[0].to_string()
                }
            });
            format!("<{}{}{}>", &caps[1], kept, &caps[3])
        })
        .into_owned()
}

fn attribute_value<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    ATTRIBUTE_RE.captures_iter(attributes).find_map(|caps| {
        if !caps[1].eq_ignore_ascii_case(name) {
            return None;
        }
        Some(
            caps.get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str()),
        )
    })
}

fn push_text(out: &mut String, text: &str, code_depth: usize) {
    if code_depth > 0 || !(text.contains('&') || text.contains('>')) {
        out.push_str(text);
        return;
    }
    out.push_str(&htmlize::escape_text(htmlize::unescape(text)));
}

fn tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    for (idx, c) in tag.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(idx + 1),
            (None, _) => {}
        }
    }
    None
}

fn track_code_depth(tag: &str, depth: usize) -> usize {
    let lower = tag.to_ascii_lowercase();
    let is_named = |prefix: &str| {
        lower
            .strip_prefix(prefix)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| !c.is_ascii_alphanumeric())
    };
    if is_named("</code") || is_named("</pre") {
        return depth.saturating_sub(1);
    }
    if (is_named("<code") || is_named("<pre")) && !lower.ends_with("/>") {
        return depth + 1;
    }
    depth
}
