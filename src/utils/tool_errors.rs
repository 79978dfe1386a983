use crate::errors::ToolError;
use crate::utils::suggest::suggest;

/// Raised when a manager is asked for a tool it does not own.
pub fn unknown_tool_error(group: &str, tool: &str, known_tools: &[&str]) -> ToolError {
    let known: Vec<String> = known_tools.iter().map(|s| s.to_string()).collect();
    let suggestions = suggest(tool, &known, 3);
    let mut err = ToolError::internal(format!("Unknown {} tool: {}", group, tool));
    if !suggestions.is_empty() {
        err = err.with_hint(format!("Did you mean: {}?", suggestions.join(", ")));
    }
    err.with_details(serde_json::json!({
        "known_tools": known,
        "did_you_mean": suggestions,
    }))
}
