//! String-level pre-normalization.
//!
//! An ordered list of string-to-string passes applied identically to both sides of a
//! comparison before any tree is built. Later passes rely on the output shape of earlier
//! ones (quoting, self-closed void tags, decoded entities), so the order is fixed.

pub mod passes;

use thiserror::Error;
use tracing::debug;

use crate::xml::ReformatError;

/// Errors a single normalization pass can report.
#[derive(Debug, Error)]
pub enum PassError {
    #[error(transparent)]
    Reformat(#[from] ReformatError),
}

pub type PassFn = fn(&str) -> Result<String, PassError>;

/// A named normalization step.
#[derive(Debug, Clone, Copy)]
pub struct Pass {
    pub name: &'static str,
    pub apply: PassFn,
}

impl Pass {
    pub const fn new(name: &'static str, apply: PassFn) -> Self {
        Self { name, apply }
    }
}

/// Ordered normalization passes.
#[derive(Debug, Clone)]
pub struct Pipeline {
    passes: Vec<Pass>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    /// Full pipeline: every renderer-injected attribute is removed.
    pub fn standard() -> Self {
        Self::with_attribute_pass(Pass::new(
            "strip_diagnostic_attributes",
            passes::strip_diagnostic_attributes,
        ))
    }

    /// Same pipeline, but line-range and raw-source attributes survive for the tree walk.
    pub fn preserving_provenance() -> Self {
        Self::with_attribute_pass(Pass::new(
            "strip_render_attributes",
            passes::strip_render_attributes,
        ))
    }

    pub fn from_passes(passes: Vec<Pass>) -> Self {
        Self { passes }
    }

    fn with_attribute_pass(attributes: Pass) -> Self {
        Self::from_passes(vec![
            Pass::new("strip_comments", passes::strip_comments),
            Pass::new("collapse_unresolved_xrefs", passes::collapse_unresolved_xrefs),
            attributes,
            Pass::new("remove_empty_paragraphs", passes::remove_empty_paragraphs),
            Pass::new("normalize_block_whitespace", passes::normalize_block_whitespace),
            Pass::new("collapse_inline_code", passes::collapse_inline_code),
            Pass::new("trim_block_containers", passes::trim_block_containers),
            Pass::new("canonicalize_alignment", passes::canonicalize_alignment),
            Pass::new("canonicalize_video_urls", passes::canonicalize_video_urls),
            Pass::new("decode_entities", passes::decode_entities),
            Pass::new("reformat_xml", passes::reformat),
        ])
    }

    pub fn pass_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.passes.iter().map(|pass| pass.name)
    }

    /// Apply every pass in order. A pass that fails is skipped for this input only.
    pub fn run(&self, html: &str) -> String {
        let mut current = html.to_string();
        for pass in &self.passes {
            match (pass.apply)(&current) {
                Ok(next) => current = next,
                Err(err) => debug!(pass = pass.name, error = %err, "normalization pass skipped"),
            }
        }
        current
    }
}

/// Normalize raw markup text: entities decoded, then whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    collapse_whitespace(&htmlize::unescape(text))
}

/// Collapse whitespace runs to one space and trim the ends.
///
/// Parsed text nodes are already decoded, so tree comparison uses this and never decodes twice.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
