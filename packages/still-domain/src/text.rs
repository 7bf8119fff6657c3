pub const ELLIPSIS: &str = "...";

/// Keeps at most `max_chars` Unicode scalar values and appends an ellipsis when anything was cut.
pub fn truncate_runes(input: &str, max_chars: usize) -> String {
	match input.char_indices().nth(max_chars) {
		Some((byte_idx, _)) => format!("{}{ELLIPSIS}", &input[..byte_idx]),
		None => input.to_string(),
	}
}
