use crate::result::DiffResult;

/// Format diff results as JSON.
pub fn format_json(results: &[DiffResult]) -> String {
    serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string())
}
