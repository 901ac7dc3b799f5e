use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

pub const DEFAULT_MOOD: &str = "neutral";
pub const DEFAULT_MOOD_COLOR: &str = "#9E9E9E";
pub const MOODS: [&str; 10] = [
	"happy", "sad", "anxious", "angry", "calm", "excited", "grateful", "tired", "reflective",
	"neutral",
];

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct MoodTag {
	pub mood: String,
	pub color: String,
}
impl Default for MoodTag {
	fn default() -> Self {
		Self { mood: DEFAULT_MOOD.to_string(), color: DEFAULT_MOOD_COLOR.to_string() }
	}
}

pub fn build_mood_prompt(entry_content: &str) -> String {
	format!(
		"Classify the overall mood of the journal entry below.\n\
		Pick exactly one mood from: {moods}.\n\
		Also pick a hex color code that matches the mood.\n\
		Respond with a single JSON object inside a ```json code block: \
		{{\"mood\": \"...\", \"color\": \"#RRGGBB\"}}\n\n\
		Journal entry:\n{entry_content}\n",
		moods = MOODS.join(", "),
	)
}

pub fn parse_mood_tag(response: &str) -> Result<MoodTag> {
	let object = crate::json_block::extract_json_object(response)?;
	let mood = object
		.get("mood")
		.and_then(Value::as_str)
		.map(|s| s.trim().to_ascii_lowercase())
		.filter(|s| MOODS.contains(&s.as_str()))
		.unwrap_or_else(|| DEFAULT_MOOD.to_string());
	let color = object
		.get("color")
		.and_then(Value::as_str)
		.and_then(crate::analysis::normalize_hex_color)
		.unwrap_or_else(|| DEFAULT_MOOD_COLOR.to_string());

	Ok(MoodTag { mood, color })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_known_mood() {
		let tag = parse_mood_tag("```json\n{\"mood\": \"Happy\", \"color\": \"#ffd700\"}\n```")
			.expect("mood tag");

		assert_eq!(tag, MoodTag { mood: "happy".to_string(), color: "#FFD700".to_string() });
	}

	#[test]
	fn unknown_values_fall_back() {
		let tag =
			parse_mood_tag("```json\n{\"mood\": \"bamboozled\", \"color\": \"teal\"}\n```")
				.expect("mood tag");

		assert_eq!(tag, MoodTag::default());
	}

	#[test]
	fn unfenced_reply_is_an_extraction_error() {
		assert!(matches!(
			parse_mood_tag("{\"mood\": \"happy\", \"color\": \"#FFD700\"}"),
			Err(crate::Error::Extraction { .. })
		));
	}

	#[test]
	fn prompt_lists_every_mood() {
		let prompt = build_mood_prompt("Quiet day.");

		assert!(MOODS.iter().all(|mood| prompt.contains(mood)));
		assert!(prompt.ends_with("Quiet day.\n"));
	}
}
