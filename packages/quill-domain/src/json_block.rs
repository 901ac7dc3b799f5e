use regex::Regex;
use serde_json::{Map, Value};

use crate::{Error, Result};

const FENCE_PATTERN: &str = r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```";

/// Pulls the first JSON object out of a model response.
///
/// Only fenced code blocks are considered, in order. JSON written straight into prose is an
/// extraction error.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>> {
	if let Ok(re) = Regex::new(FENCE_PATTERN) {
		for caps in re.captures_iter(text) {
			if let Some(object) = caps.get(1).and_then(|body| parse_object(body.as_str())) {
				return Ok(object);
			}
		}
	}

	Err(Error::Extraction {
		message: "Response does not contain a fenced JSON object.".to_string(),
	})
}

fn parse_object(raw: &str) -> Option<Map<String, Value>> {
	match serde_json::from_str::<Value>(raw.trim()) {
		Ok(Value::Object(object)) => Some(object),
		_ => None,
	}
}
