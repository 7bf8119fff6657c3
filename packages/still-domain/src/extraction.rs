use serde::Serialize;

pub const FIELD_SEPARATOR: char = ';';
pub const LIST_SEPARATOR: char = ',';

const FIELD_COUNT: usize = 3;
const LIST_MARKERS: [&str; 3] = ["- ", "* ", "\u{2022} "];

/// One event extracted from a window summary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedItem {
	pub participants: Vec<String>,
	pub tags: Vec<String>,
	pub description: String,
}

/// Parses `participants;tags;description` records, one per line.
///
/// Records with the wrong number of fields or an empty description are dropped instead of
/// failing the whole reply.
pub fn parse_extracted_items(raw: &str) -> Vec<ExtractedItem> {
	raw.lines().filter_map(parse_record).collect()
}

pub fn parse_record(line: &str) -> Option<ExtractedItem> {
	let mut line = line.trim();

	for marker in LIST_MARKERS {
		if let Some(rest) = line.strip_prefix(marker) {
			line = rest.trim_start();

			break;
		}
	}

	if line.is_empty() {
		return None;
	}

	let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

	if fields.len() != FIELD_COUNT {
		return None;
	}

	let description = fields[2].trim();

	if description.is_empty() {
		return None;
	}

	Some(ExtractedItem {
		participants: split_list(fields[0]),
		tags: split_list(fields[1]),
		description: description.to_string(),
	})
}

/// Formats an item back into the wire shape the extractor is asked to produce.
pub fn format_record(item: &ExtractedItem) -> String {
	format!(
		"{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
		item.participants.join(","),
		item.tags.join(","),
		item.description
	)
}

fn split_list(field: &str) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();

	for value in field.split(LIST_SEPARATOR).map(str::trim).filter(|value| !value.is_empty()) {
		if !out.iter().any(|existing| existing == value) {
			out.push(value.to_string());
		}
	}

	out
}
