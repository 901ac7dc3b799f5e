use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const NO_ENTRIES_ANSWER: &str = "no entries";
pub const NO_RELEVANT_ENTRIES_ANSWER: &str = "No relevant entries found for your question.";

/// A similarity-search hit, ordered by descending relevance.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievedMatch {
	pub entry_id: String,
	pub similarity_rank: usize,
	pub score: f32,
	pub timestamp: String,
	pub source_tag: String,
	pub text: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RelevantEntry {
	pub id: String,
	pub date: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct QaResult {
	pub answer: String,
	pub relevant_entries: Vec<RelevantEntry>,
}
impl QaResult {
	pub fn no_entries() -> Self {
		Self { answer: NO_ENTRIES_ANSWER.to_string(), relevant_entries: Vec::new() }
	}

	pub fn no_relevant_entries() -> Self {
		Self { answer: NO_RELEVANT_ENTRIES_ANSWER.to_string(), relevant_entries: Vec::new() }
	}
}

pub fn build_qa_prompt(question: &str, matches: &[RetrievedMatch]) -> String {
	let mut prompt = String::from(
		"You are a thoughtful journaling assistant. The journal entries below belong to the person asking.\n\n",
	);

	for (index, item) in matches.iter().enumerate() {
		prompt.push_str(&format!(
			"[Entry {n}]\nEntry ID: {id}\nDate: {date}\nContent:\n{content}\n\n",
			n = index + 1,
			id = item.entry_id,
			date = item.timestamp,
			content = item.text,
		));
	}

	prompt.push_str(&format!("Question: {question}\n\n"));
	prompt.push_str(
		"Answer using only the journal entries above. If they do not contain the answer, say so plainly.",
	);

	prompt
}

/// Collapses matches to one cited entry per id, keeping first-seen order.
pub fn dedup_relevant_entries(matches: &[RetrievedMatch]) -> Vec<RelevantEntry> {
	let mut seen = HashSet::new();

	matches
		.iter()
		.filter(|item| seen.insert(item.entry_id.as_str()))
		.map(|item| RelevantEntry { id: item.entry_id.clone(), date: item.timestamp.clone() })
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn hit(id: &str, rank: usize) -> RetrievedMatch {
		RetrievedMatch {
			entry_id: id.to_string(),
			similarity_rank: rank,
			score: 0.9 - rank as f32 * 0.1,
			timestamp: format!("2024-03-0{}T08:00:00Z", rank + 1),
			source_tag: "journal".to_string(),
			text: format!("content of {id}"),
		}
	}

	#[test]
	fn dedup_keeps_first_occurrence_in_rank_order() {
		let matches = vec![hit("e2", 0), hit("e1", 1), hit("e2", 2), hit("e3", 3), hit("e1", 4)];
		let ids = dedup_relevant_entries(&matches)
			.into_iter()
			.map(|entry| entry.id)
			.collect::<Vec<_>>();

		assert_eq!(ids, vec!["e2", "e1", "e3"]);
		assert_eq!(dedup_relevant_entries(&matches)[0].date, "2024-03-01T08:00:00Z");
	}

	#[test]
	fn prompt_labels_each_entry_before_the_question() {
		let prompt = build_qa_prompt("How did I sleep?", &[hit("e1", 0), hit("e2", 1)]);
		let first = prompt.find("Entry ID: e1").expect("e1 block");
		let second = prompt.find("Entry ID: e2").expect("e2 block");
		let question = prompt.find("Question: How did I sleep?").expect("question");

		assert!(first < second && second < question);
		assert!(prompt.contains("content of e1"));
		assert!(prompt.contains("Date: 2024-03-01T08:00:00Z"));
		assert!(prompt.ends_with("say so plainly."));
	}
}
