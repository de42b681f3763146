use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Attribute injected by the legacy renderer with the first markdown line of a block.
pub const SOURCE_START_ATTR: &str = "sourcestartlinenumber";
/// Attribute injected by the legacy renderer with the last markdown line of a block.
pub const SOURCE_END_ATTR: &str = "sourceendlinenumber";

/// Markdown line range an HTML element was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Build a span from raw attribute values. Both must parse and be ordered.
    pub fn from_attributes(start: Option<&str>, end: Option<&str>) -> Option<Self> {
        let start = start?.trim().parse::<usize>().ok()?;
        let end = end?.trim().parse::<usize>().ok()?;
        if end < start {
            return None;
        }
        Some(Self { start, end })
    }
}

impl Display for SourceSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "line {}", self.start)
        } else {
            write!(f, "lines {}-{}", self.start, self.end)
        }
    }
}
