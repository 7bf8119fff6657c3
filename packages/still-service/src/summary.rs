use crate::{
	Error, Result, StillService,
	telemetry::{self, Item, Step, StepTimer},
};
use still_domain::extraction::{self, ExtractedItem};

impl StillService {
	/// Summarizes transcript lines. Empty input is rejected before the backend is called.
	pub async fn summarize(&self, lines: &[String]) -> Result<String> {
		if lines.is_empty() {
			return Err(Error::EmptyInput { message: "No messages to summarize.".to_string() });
		}

		let timer = StepTimer::start(Step::Summarize);
		let result = self
			.providers
			.summarizer
			.summarize(&self.cfg.providers.summarizer, lines)
			.await
			.and_then(|text| {
				let text = text.trim();

				if text.is_empty() {
					Err(Error::Provider { message: "Summarizer returned empty text.".to_string() })
				} else {
					Ok(text.to_string())
				}
			});

		timer.finish(result.is_ok());

		result
	}

	/// Extracts event records from a summary, dropping malformed ones.
	pub async fn extract(&self, summary: &str) -> Result<Vec<ExtractedItem>> {
		if summary.trim().is_empty() {
			return Err(Error::EmptyInput { message: "Summary is empty.".to_string() });
		}

		let timer = StepTimer::start(Step::Extract);
		let result = self.providers.extractor.extract(&self.cfg.providers.extractor, summary).await;

		timer.finish(result.is_ok());

		let raw = result?;
		let items = extraction::parse_extracted_items(&raw);
		let records = raw.lines().filter(|line| !line.trim().is_empty()).count();
		let dropped = records.saturating_sub(items.len());

		if dropped > 0 {
			tracing::warn!(dropped, kept = items.len(), "Dropped malformed extraction records.");
		}

		telemetry::count(Item::ItemsExtracted, items.len());

		Ok(items)
	}
}
