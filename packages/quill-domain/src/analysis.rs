//! Per-entry personality analysis: prompt, tolerant decoding, and defaults.
//!
//! Decoding never fails on a partial record. Missing or malformed fields fall back to defaults;
//! only a response with no JSON object at all is an extraction error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

pub const DEFAULT_TRAIT_SCORE: u8 = 50;
pub const UNKNOWN_TYPE: &str = "Unknown";
pub const MAX_LIST_ITEMS: usize = 5;
pub const TRAIT_KEYS: [&str; 5] =
	["openness", "conscientiousness", "extraversion", "agreeableness", "neuroticism"];

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TraitScores {
	pub openness: u8,
	pub conscientiousness: u8,
	pub extraversion: u8,
	pub agreeableness: u8,
	pub neuroticism: u8,
}
impl Default for TraitScores {
	fn default() -> Self {
		Self {
			openness: DEFAULT_TRAIT_SCORE,
			conscientiousness: DEFAULT_TRAIT_SCORE,
			extraversion: DEFAULT_TRAIT_SCORE,
			agreeableness: DEFAULT_TRAIT_SCORE,
			neuroticism: DEFAULT_TRAIT_SCORE,
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AnalysisRecord {
	pub traits: TraitScores,
	pub mbti_type: String,
	pub type_description: String,
	pub strengths: Vec<String>,
	pub growth_areas: Vec<String>,
	pub career_suggestions: Vec<String>,
	pub color: Option<String>,
}

pub fn build_analysis_prompt(entry_content: &str) -> String {
	format!(
		"Analyze the personality of the author of the journal entry below.\n\
		Respond with a single JSON object inside a ```json code block, using exactly these fields:\n\
		{{\n\
		\"openness\": integer 0-100,\n\
		\"conscientiousness\": integer 0-100,\n\
		\"extraversion\": integer 0-100,\n\
		\"agreeableness\": integer 0-100,\n\
		\"neuroticism\": integer 0-100,\n\
		\"mbti_type\": four-letter MBTI code such as \"INTJ\",\n\
		\"type_description\": one or two sentences describing that type for this author,\n\
		\"strengths\": 3 to 5 short strings,\n\
		\"growth_areas\": 3 to 5 short strings,\n\
		\"career_suggestions\": 3 to 5 short strings,\n\
		\"color\": a hex color code such as \"#4A90E2\" that represents the entry\n\
		}}\n\n\
		Journal entry:\n{entry_content}\n"
	)
}

/// Parses a model response into an analysis record.
pub fn parse_analysis(response: &str) -> Result<AnalysisRecord> {
	let object = crate::json_block::extract_json_object(response)?;

	Ok(decode_analysis(&object))
}

pub fn decode_analysis(object: &Map<String, Value>) -> AnalysisRecord {
	let traits_source = object.get("traits").and_then(Value::as_object).unwrap_or(object);
	let score = |key: &str| {
		traits_source.get(key).or_else(|| object.get(key)).map_or(DEFAULT_TRAIT_SCORE, trait_score)
	};

	AnalysisRecord {
		traits: TraitScores {
			openness: score("openness"),
			conscientiousness: score("conscientiousness"),
			extraversion: score("extraversion"),
			agreeableness: score("agreeableness"),
			neuroticism: score("neuroticism"),
		},
		mbti_type: object
			.get("mbti_type")
			.or_else(|| object.get("mbti"))
			.and_then(Value::as_str)
			.and_then(normalize_mbti)
			.unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
		type_description: object
			.get("type_description")
			.and_then(Value::as_str)
			.map(|s| s.trim().to_string())
			.unwrap_or_default(),
		strengths: string_list(object.get("strengths")),
		growth_areas: string_list(object.get("growth_areas")),
		career_suggestions: string_list(object.get("career_suggestions")),
		color: object.get("color").and_then(Value::as_str).and_then(normalize_hex_color),
	}
}

/// Accepts numbers and numeric strings, rounds, and clamps into `0..=100`.
pub fn trait_score(value: &Value) -> u8 {
	let raw = match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse::<f64>().ok(),
		_ => None,
	};

	match raw {
		Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u8,
		_ => DEFAULT_TRAIT_SCORE,
	}
}

pub fn normalize_mbti(raw: &str) -> Option<String> {
	let code = raw.trim().to_ascii_uppercase();
	let letters = code.as_bytes();

	if letters.len() != 4 {
		return None;
	}

	let valid = matches!(letters[0], b'E' | b'I')
		&& matches!(letters[1], b'S' | b'N')
		&& matches!(letters[2], b'T' | b'F')
		&& matches!(letters[3], b'J' | b'P');

	valid.then_some(code)
}

/// Normalizes `#RGB` or `#RRGGBB` (leading `#` optional) to uppercase `#RRGGBB`.
pub fn normalize_hex_color(raw: &str) -> Option<String> {
	let hex = raw.trim().trim_start_matches('#');

	if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
		return None;
	}

	match hex.len() {
		6 => Some(format!("#{}", hex.to_ascii_uppercase())),
		3 => {
			let expanded = hex.chars().flat_map(|c| [c, c]).collect::<String>();

			Some(format!("#{}", expanded.to_ascii_uppercase()))
		},
		_ => None,
	}
}

fn string_list(value: Option<&Value>) -> Vec<String> {
	let Some(items) = value.and_then(Value::as_array) else {
		return Vec::new();
	};

	items
		.iter()
		.filter_map(Value::as_str)
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.take(MAX_LIST_ITEMS)
		.map(str::to_string)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scores_clamp_and_round() {
		assert_eq!(trait_score(&Value::from(120)), 100);
		assert_eq!(trait_score(&Value::from(-3)), 0);
		assert_eq!(trait_score(&Value::from(72.6)), 73);
		assert_eq!(trait_score(&Value::String(" 41 ".to_string())), 41);
		assert_eq!(trait_score(&Value::Bool(true)), DEFAULT_TRAIT_SCORE);
	}

	#[test]
	fn mbti_codes_are_validated() {
		assert_eq!(normalize_mbti("intj").as_deref(), Some("INTJ"));
		assert_eq!(normalize_mbti("ENFP "), Some("ENFP".to_string()));
		assert_eq!(normalize_mbti("XYZW"), None);
		assert_eq!(normalize_mbti("INTJX"), None);
	}

	#[test]
	fn hex_colors_are_normalized() {
		assert_eq!(normalize_hex_color("#4a90e2").as_deref(), Some("#4A90E2"));
		assert_eq!(normalize_hex_color("abc").as_deref(), Some("#AABBCC"));
		assert_eq!(normalize_hex_color("#12345"), None);
		assert_eq!(normalize_hex_color("blue"), None);
	}

	#[test]
	fn nested_traits_object_is_accepted() {
		let json = serde_json::json!({ "traits": { "openness": 90 }, "extraversion": 10 });
		let record = decode_analysis(json.as_object().expect("object"));

		assert_eq!(record.traits.openness, 90);
		assert_eq!(record.traits.extraversion, 10);
		assert_eq!(record.traits.neuroticism, DEFAULT_TRAIT_SCORE);
	}

	#[test]
	fn lists_drop_non_strings_and_cap_length() {
		let value = serde_json::json!(["a", 1, " ", "b", "c", "d", "e", "f"]);

		assert_eq!(string_list(Some(&value)), vec!["a", "b", "c", "d", "e"]);
		assert!(string_list(None).is_empty());
	}
}
