//! Output formatting for CLI

use crate::resource::FileState;

/// Format a file state as a short header followed by the content
pub fn format_file_state(state: &FileState) -> String {
    let mut output = String::new();
    output.push_str(&format!("# id:     {}\n", state.id));
    output.push_str(&format!("# path:   {}\n", state.path));
    output.push_str(&format!("# branch: {}\n", state.branch));
    output.push_str(&state.content);
    if !state.content.ends_with('\n') {
        output.push('\n');
    }
    output
}

/// Format a file state as pretty JSON
pub fn format_file_state_json(state: &FileState) -> String {
    serde_json::to_string_pretty(state).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}
