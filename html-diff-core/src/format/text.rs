use crate::result::{DiffResult, DiffStatus};

/// Format diff results as plain text.
pub fn format_text(results: &[DiffResult]) -> String {
    let mut lines = Vec::with_capacity(results.len() + 1);
    for result in results {
        match result.status {
            DiffStatus::Equivalent => lines.push(format!("= {}", result.file)),
            DiffStatus::Divergent => {
                match result.span {
                    Some(span) => lines.push(format!("~ {} ({span})", result.file)),
                    None => lines.push(format!("~ {}", result.file)),
                }
                if let Some(divergence) = &result.divergence {
                    lines.push(format!("  reason: {}", divergence.reason));
                    if let Some(first) = &divergence.first {
                        lines.push(format!("  first:  {}", one_line(first)));
                    }
                    if let Some(second) = &divergence.second {
                        lines.push(format!("  second: {}", one_line(second)));
                    }
                }
            }
        }
    }
    lines.join("\n")
}

/// Format a simple summary of result counts.
pub fn format_summary(results: &[DiffResult]) -> String {
    let divergent = results
        .iter()
        .filter(|result| result.status == DiffStatus::Divergent)
        .count();
    let equivalent = results.len() - divergent;
    format!("equivalent={equivalent} divergent={divergent}")
}

fn one_line(markup: &str) -> String {
    markup.split_whitespace().collect::<Vec<_>>().join(" ")
}
