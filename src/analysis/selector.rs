//! Take selection: picking the best member of a retake group.
//!
//! The resolver only depends on the `TakeSelector` trait. The LLM-backed
//! implementation is a blocking chat-completions call; when it is not
//! configured or fails, the deterministic longest-duration rule takes over
//! per group.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::analysis::retake::RetakeGroup;
use crate::error::EditError;

pub trait TakeSelector {
    /// Index of the best member within the group.
    fn select_best(&self, group: &RetakeGroup) -> Result<usize, EditError>;

    fn name(&self) -> &'static str;
}

/// Deterministic fallback: the longest take wins.
pub fn longest_member(group: &RetakeGroup) -> usize {
    group
        .members
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.duration()
                .partial_cmp(&b.duration())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct DurationSelector;

impl TakeSelector for DurationSelector {
    fn select_best(&self, group: &RetakeGroup) -> Result<usize, EditError> {
        Ok(longest_member(group))
    }

    fn name(&self) -> &'static str {
        "duration"
    }
}

/// LLM-backed selection via an OpenAI-compatible chat completions endpoint.
pub struct LlmSelector {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl LlmSelector {
    pub fn new(endpoint: String, model: String, api_key: String) -> Result<Self, EditError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| EditError::Collaborator(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
        })
    }

    /// Build a selector from the environment, or None when no key is set.
    pub fn from_env(endpoint: &str, model: &str) -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        if api_key.is_empty() {
            return None;
        }
        Self::new(endpoint.to_string(), model.to_string(), api_key).ok()
    }

    fn prompt(group: &RetakeGroup) -> String {
        let takes = group
            .members
            .iter()
            .enumerate()
            .map(|(i, member)| {
                format!(
                    "{}. \"{}\" (duration: {:.1}s)",
                    i + 1,
                    member.text,
                    member.duration()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are analyzing multiple takes of the same spoken content.\n\
             Select the best take based on completeness of the thought, natural flow,\n\
             absence of hesitation or filler words, and delivery.\n\n\
             Here are the takes:\n{takes}\n\n\
             Respond with ONLY the number (1, 2, 3, ...) of the best take. Nothing else."
        )
    }
}

impl TakeSelector for LlmSelector {
    fn select_best(&self, group: &RetakeGroup) -> Result<usize, EditError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": Self::prompt(group)}],
            "max_tokens": 10,
            "temperature": 0,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|err| EditError::Collaborator(err.to_string()))?
            .error_for_status()
            .map_err(|err| EditError::Collaborator(err.to_string()))?;

        let parsed: ChatResponse = response
            .json()
            .map_err(|err| EditError::Collaborator(err.to_string()))?;

        let answer = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| EditError::Collaborator("empty completion".to_string()))?;

        let number: usize = answer
            .parse()
            .map_err(|_| EditError::Collaborator(format!("non-numeric answer: {answer:?}")))?;

        // The prompt is 1-indexed.
        let index = number
            .checked_sub(1)
            .ok_or_else(|| EditError::Collaborator("answer was zero".to_string()))?;
        if index >= group.members.len() {
            return Err(EditError::Collaborator(format!(
                "answer {number} out of range for {} takes",
                group.members.len()
            )));
        }

        Ok(index)
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
