pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_chat_messages.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_chat_messages.sql")),
				"tables/002_identities.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_identities.sql")),
				"tables/003_joined_chats.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_joined_chats.sql")),
				"tables/004_events.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_events.sql")),
				"tables/005_event_identities.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_event_identities.sql")),
				"tables/006_graph_nodes.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_graph_nodes.sql")),
				"tables/007_graph_edges.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_graph_edges.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
