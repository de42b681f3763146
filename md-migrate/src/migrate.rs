//! The per-unit keep-or-substitute decision loop.
//!
//! Each unit (a top-level token, or the whole file) is rendered by both engines. Equivalent
//! renderings keep the author's source byte for byte; divergent ones are replaced by the
//! serializer's reconstruction and leave an [`AuditEntry`]. A unit that fails anywhere keeps
//! its source and is recorded as a [`UnitFailure`] instead of stopping the file.

use std::ops::Range;

use html_diff_core::{Comparator, Comparison, DiffStatus, SourceSpan};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::render::{MarkdownRenderer, RenderError};
use crate::serialize::{SerializeError, TokenSerializer};
use crate::token::{tokenize, TokenKind};

/// How much markdown one decision covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Token,
    File,
}

/// One substitution, kept for human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub token_kind: String,
    pub line: usize,
}

/// A unit that could not be decided and kept its original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub token_kind: String,
    pub line: usize,
    pub reason: String,
}

/// Decision for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Kept,
    Substituted {
        text: String,
        /// Divergence span relative to the unit's first line.
        span: Option<SourceSpan>,
    },
}

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("{engine} renderer failed: {source}")]
    Render {
        engine: &'static str,
        #[source]
        source: RenderError,
    },
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

/// Result of migrating one markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMigration {
    pub file: String,
    pub output: String,
    pub changed: bool,
    /// `Divergent` when at least one unit was substituted.
    pub status: DiffStatus,
    /// Lines of the first divergence in the file.
    pub span: Option<SourceSpan>,
    pub entries: Vec<AuditEntry>,
    pub failures: Vec<UnitFailure>,
}

struct Unit {
    kind: TokenKind,
    line: usize,
    range: Range<usize>,
}

/// Drives both renderers and the comparator over markdown units.
///
/// All collaborators are borrowed, so one migrator can be shared by every worker of a batch.
pub struct Migrator<'a> {
    legacy: &'a dyn MarkdownRenderer,
    replacement: &'a dyn MarkdownRenderer,
    serializer: &'a dyn TokenSerializer,
    comparator: Comparator<'a>,
    granularity: Granularity,
}

impl<'a> Migrator<'a> {
    pub fn new(
        legacy: &'a dyn MarkdownRenderer,
        replacement: &'a dyn MarkdownRenderer,
        serializer: &'a dyn TokenSerializer,
        comparator: Comparator<'a>,
    ) -> Self {
        Self {
            legacy,
            replacement,
            serializer,
            comparator,
            granularity: Granularity::default(),
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Render `source` with both engines and decide whether it can stay as written.
    ///
    /// A divergent unit whose reconstruction equals its source is kept as well.
    pub fn decide_unit(&self, file: &str, source: &str) -> Result<UnitOutcome, UnitError> {
        let first = self.render(self.legacy, source, file)?;
        let second = self.render(self.replacement, source, file)?;

        match self.comparator.compare(&first, &second) {
            Comparison::Equivalent => Ok(UnitOutcome::Kept),
            Comparison::Divergent(divergence) => {
                debug!(file, reason = %divergence.reason, "renderings diverge");
                let text = self.serializer.serialize(source)?;
                if text.trim_end() == source.trim_end() {
                    debug!(file, "reconstruction matches source, keeping unit");
                    return Ok(UnitOutcome::Kept);
                }
                Ok(UnitOutcome::Substituted {
                    text,
                    span: divergence.span,
                })
            }
        }
    }

    fn render(
        &self,
        renderer: &dyn MarkdownRenderer,
        source: &str,
        file: &str,
    ) -> Result<String, UnitError> {
        renderer
            .render(source, file)
            .map_err(|source| UnitError::Render {
                engine: renderer.name(),
                source,
            })
    }

    /// Migrate one file. Units are visited and audited in document order; text between units
    /// is copied unchanged.
    pub fn migrate_file(&self, file: &str, markdown: &str) -> FileMigration {
        let units = self.units(markdown);
        let mut output = String::with_capacity(markdown.len());
        let mut entries = Vec::new();
        let mut failures = Vec::new();
        let mut first_span = None;
        let mut cursor = 0;

        for unit in units {
            output.push_str(&markdown[cursor..unit.range.start]);
            let original = &markdown[unit.range.clone()];
            let token_kind = unit.kind.as_str();

            match self.decide_unit(file, original) {
                Ok(UnitOutcome::Kept) => output.push_str(original),
                Ok(UnitOutcome::Substituted { text, span }) => {
                    let span = span.map(|span| {
                        SourceSpan::new(span.start + unit.line - 1, span.end + unit.line - 1)
                    });
                    let line = match self.granularity {
                        Granularity::Token => unit.line,
                        Granularity::File => span.map_or(unit.line, |span| span.start),
                    };
                    let body = original.trim_end();
                    output.push_str(text.trim_end());
                    output.push_str(&original[body.len()..]);

                    info!(file, token_kind, line, "substituted reconstructed markdown");
                    entries.push(AuditEntry {
                        token_kind: token_kind.to_string(),
                        line,
                    });
                    first_span = first_span.or(span);
                }
                Err(err) => {
                    warn!(file, token_kind, line = unit.line, error = %err, "unit failed, keeping original");
                    failures.push(UnitFailure {
                        token_kind: token_kind.to_string(),
                        line: unit.line,
                        reason: err.to_string(),
                    });
                    output.push_str(original);
                }
            }
            cursor = unit.range.end;
        }
        output.push_str(&markdown[cursor..]);

        let status = if entries.is_empty() {
            DiffStatus::Equivalent
        } else {
            DiffStatus::Divergent
        };
        FileMigration {
            file: file.to_string(),
            changed: output != markdown,
            output,
            status,
            span: first_span,
            entries,
            failures,
        }
    }

    fn units(&self, markdown: &str) -> Vec<Unit> {
        match self.granularity {
            Granularity::Token => tokenize(markdown)
                .into_iter()
                .map(|token| Unit {
                    kind: token.kind,
                    line: token.line,
                    range: token.range,
                })
                .collect(),
            Granularity::File => vec![Unit {
                kind: TokenKind::Document,
                line: 1,
                range: 0..markdown.len(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use html_diff_core::{default_rules, Comparator, DiffStatus, SourceSpan};
    use pretty_assertions::assert_eq;

    use super::{Granularity, Migrator, UnitOutcome};
    use crate::render::{MarkdownRenderer, RenderError};
    use crate::serialize::{SerializeError, TokenSerializer};

    /// Renders every unit as one paragraph with line provenance.
    struct Plain;

    impl MarkdownRenderer for Plain {
        fn name(&self) -> &'static str {
            "plain"
        }

        fn render(&self, markdown: &str, _file: &str) -> Result<String, RenderError> {
            let lines = markdown.trim_end().lines().count().max(1);
            Ok(format!(
                "<p sourcestartlinenumber=\"1\" sourceendlinenumber=\"{lines}\">{}</p>",
                markdown.trim()
            ))
        }
    }

    /// Drops every `+`, so units containing one diverge from [`Plain`].
    struct Stripping;

    impl MarkdownRenderer for Stripping {
        fn name(&self) -> &'static str {
            "stripping"
        }

        fn render(&self, markdown: &str, _file: &str) -> Result<String, RenderError> {
            if markdown.contains('!') {
                return Err(RenderError::Rejected {
                    engine: "stripping",
                    reason: "bang".to_string(),
                });
            }
            Ok(format!("<p>{}</p>", markdown.trim().replace('+', "")))
        }
    }

    struct Unplus;

    impl TokenSerializer for Unplus {
        fn serialize(&self, source: &str) -> Result<String, SerializeError> {
            Ok(source.replace('+', ""))
        }
    }

    struct Identity;

    impl TokenSerializer for Identity {
        fn serialize(&self, source: &str) -> Result<String, SerializeError> {
            Ok(source.to_string())
        }
    }

    const DOC: &str = "# Title\nalpha+\n\n---\nbeta+\n\ngamma\n\ndelta+\n";

    #[test]
    fn keeps_equivalent_units_verbatim() {
        let rules = default_rules();
        let migrator = Migrator::new(&Plain, &Plain, &Unplus, Comparator::new(&rules));
        let result = migrator.migrate_file("a.md", DOC);
        assert!(!result.changed);
        assert_eq!(result.output, DOC);
        assert_eq!(result.status, DiffStatus::Equivalent);
        assert!(result.entries.is_empty());
    }

    #[test]
    fn audit_entries_follow_document_order() {
        let rules = default_rules();
        let migrator = Migrator::new(&Plain, &Stripping, &Unplus, Comparator::new(&rules));
        let result = migrator.migrate_file("a.md", DOC);

        let lines: Vec<usize> = result.entries.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 5, 9]);
        assert!(result.entries.iter().all(|e| e.token_kind == "paragraph"));
        assert_eq!(result.output, "# Title\nalpha\n\n---\nbeta\n\ngamma\n\ndelta\n");
        assert_eq!(result.status, DiffStatus::Divergent);
        assert_eq!(result.span, Some(SourceSpan::new(2, 2)));
    }

    #[test]
    fn migrated_output_is_a_fixed_point() {
        let rules = default_rules();
        let migrator = Migrator::new(&Plain, &Stripping, &Unplus, Comparator::new(&rules));
        let once = migrator.migrate_file("a.md", DOC);
        let twice = migrator.migrate_file("a.md", &once.output);
        assert_eq!(twice.output, once.output);
        assert!(!twice.changed);
        assert!(twice.entries.is_empty());
    }

    #[test]
    fn unchanged_reconstruction_is_not_audited() {
        let rules = default_rules();
        let migrator = Migrator::new(&Plain, &Stripping, &Identity, Comparator::new(&rules));
        let result = migrator.migrate_file("a.md", DOC);
        assert!(!result.changed);
        assert!(result.entries.is_empty());
        assert_eq!(result.status, DiffStatus::Equivalent);
        assert_eq!(
            migrator.decide_unit("a.md", "x+\n").expect("decide"),
            UnitOutcome::Kept
        );
    }

    #[test]
    fn failing_unit_keeps_source_and_is_recorded() {
        let rules = default_rules();
        let migrator = Migrator::new(&Plain, &Stripping, &Unplus, Comparator::new(&rules));
        let source = "one+\n\ntwo!\n\nthree\n";
        let result = migrator.migrate_file("a.md", source);

        assert_eq!(result.output, "one\n\ntwo!\n\nthree\n");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].line, 3);
        assert_eq!(result.failures[0].token_kind, "paragraph");
        assert!(result.failures[0].reason.contains("bang"));
    }

    #[test]
    fn file_granularity_makes_one_decision() {
        let rules = default_rules();
        let migrator = Migrator::new(&Plain, &Stripping, &Unplus, Comparator::new(&rules))
            .with_granularity(Granularity::File);
        let result = migrator.migrate_file("a.md", DOC);

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].token_kind, "document");
        assert_eq!(result.output, DOC.replace('+', ""));
    }

    #[test]
    fn decide_unit_reports_relative_span() {
        let rules = default_rules();
        let migrator = Migrator::new(&Plain, &Stripping, &Unplus, Comparator::new(&rules));
        let outcome = migrator.decide_unit("a.md", "x+\ny\n").expect("decide");
        assert_eq!(
            outcome,
            UnitOutcome::Substituted {
                text: "x\ny\n".to_string(),
                span: Some(SourceSpan::new(1, 2)),
            }
        );
    }
}
