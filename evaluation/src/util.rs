pub const BEGIN_OF_TEXT: &str = "<|begin_of_text|>";
pub const START_HEADER: &str = "<|start_header_id|>";
pub const END_HEADER: &str = "<|end_header_id|>";
pub const END_OF_TURN: &str = "<|eot_id|>";

/// Opens a turn in the Llama 3 chat format.
pub fn format_header(role: &str) -> String {
    format!("{START_HEADER}{role}{END_HEADER}\n\n")
}

/// One complete Llama 3 turn; the content is trimmed before insertion.
pub fn format_turn(role: &str, content: &str) -> String {
    format!("{}{}{END_OF_TURN}", format_header(role), content.trim())
}
