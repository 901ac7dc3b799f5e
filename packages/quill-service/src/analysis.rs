use quill_domain::{
	analysis::{self, AnalysisRecord},
	mood::{self, MoodTag},
};
use quill_providers::{Capability, CompletionOptions};

use crate::{Error, QuillService, Result};

const MOOD_MAX_TOKENS: u32 = 100;

impl QuillService {
	/// Generates a fresh personality analysis for one entry.
	///
	/// Each call regenerates the record; whether it creates or replaces a stored analysis is the
	/// caller's concern.
	pub async fn analyze(
		&self,
		entry_content: &str,
		provider_id: &str,
		api_key: &str,
	) -> Result<AnalysisRecord> {
		let selection = self.select_provider(provider_id, api_key, &[Capability::Completion])?;
		let content = self.validate_entry_content(entry_content)?;
		let prompt = analysis::build_analysis_prompt(content);
		let response = self
			.complete_prompt(
				&selection,
				&prompt,
				CompletionOptions {
					temperature: self.cfg.analysis.temperature,
					max_tokens: self.cfg.analysis.max_tokens,
				},
			)
			.await?;
		let record = analysis::parse_analysis(&response).inspect_err(|err| {
			tracing::warn!(error = %err, provider = %selection.kind, "Analysis output was not parseable.");
		})?;

		Ok(record)
	}

	pub async fn tag_mood(
		&self,
		entry_content: &str,
		provider_id: &str,
		api_key: &str,
	) -> Result<MoodTag> {
		let selection = self.select_provider(provider_id, api_key, &[Capability::Completion])?;
		let content = self.validate_entry_content(entry_content)?;
		let prompt = mood::build_mood_prompt(content);
		let response = self
			.complete_prompt(
				&selection,
				&prompt,
				CompletionOptions { temperature: 0.0, max_tokens: MOOD_MAX_TOKENS },
			)
			.await?;

		Ok(mood::parse_mood_tag(&response)?)
	}

	fn validate_entry_content<'a>(&self, content: &'a str) -> Result<&'a str> {
		let trimmed = content.trim();

		if trimmed.is_empty() {
			return Err(Error::InvalidRequest { message: "Entry content must not be empty.".to_string() });
		}

		let max_chars = self.cfg.analysis.max_entry_chars as usize;

		if trimmed.chars().count() > max_chars {
			return Err(Error::InvalidRequest {
				message: format!("Entry content must be at most {max_chars} characters."),
			});
		}

		Ok(trimmed)
	}
}
