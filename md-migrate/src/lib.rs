//! Markdown migration between two renderers.
//!
//! Every unit of a markdown file is rendered by the legacy engine and by the replacement
//! engine. When `html_diff_core` judges the two renderings equivalent, the author's source is
//! kept untouched; otherwise the unit is rewritten by the replacement serializer and an audit
//! entry records which construct and line changed.
//!
//! # Architecture
//!
//! - [`render`]: the [`render::MarkdownRenderer`] seam and both engines
//! - [`token`]: top-level block tokenizer
//! - [`serialize`]: markdown reconstruction for divergent units
//! - [`resolve`]: cross-reference lookup with bounded retries
//! - [`migrate`]: the per-unit decision loop
//! - [`batch`]: parallel drivers for migration and pairwise comparison
//! - [`report`]: key-ordered reports and terminal rendering
//! - [`source_map`], [`settings`]: TOML inputs
//!
//! # Example
//!
//! ```ignore
//! use html_diff_core::{default_rules, Comparator};
//! use md_migrate::migrate::Migrator;
//! use md_migrate::render::{LegacyRenderer, ReplacementRenderer};
//! use md_migrate::serialize::MdastSerializer;
//!
//! let rules = default_rules();
//! let legacy = LegacyRenderer::default();
//! let migrator = Migrator::new(
//!     &legacy,
//!     &ReplacementRenderer,
//!     &MdastSerializer,
//!     Comparator::new(&rules),
//! );
//! let result = migrator.migrate_file("docs/intro.md", "# Intro\n\n__Hello__\n");
//! println!("changed={} entries={}", result.changed, result.entries.len());
//! ```

pub mod batch;
pub mod migrate;
pub mod render;
pub mod report;
pub mod resolve;
pub mod serialize;
pub mod settings;
pub mod source_map;
pub mod token;
