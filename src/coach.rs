use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Task;

const GENERATE_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-05-20:generateContent";

/// Environment variable holding the text-generation API key.
pub const API_KEY_ENV: &str = "TIMEKEEP_GEMINI_API_KEY";

/// Failures of the assistant call. Fully isolated from timer and task state;
/// callers surface the message and move on.
#[derive(Debug, Error)]
pub enum CoachError {
    #[error("assistant API key is not configured; set {API_KEY_ENV}")]
    MissingApiKey,
    #[error("request was blocked upstream: {0}")]
    Blocked(String),
    #[error("assistant API error: http {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("the assistant returned an empty response")]
    EmptyResponse,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Task snapshot reduced to what the coach prompt needs.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CoachTask {
    pub title: String,
    pub duration_minutes: u64,
    pub date: String,
    pub completed: bool,
}

pub fn simplify_tasks(tasks: &[Task]) -> Vec<CoachTask> {
    tasks
        .iter()
        .map(|task| CoachTask {
            title: task.title.clone(),
            duration_minutes: (task.time_spent_ms + 30_000) / 60_000,
            date: task.created_at.format("%Y-%m-%d").to_string(),
            completed: task.completed,
        })
        .collect()
}

fn build_prompt(tasks: &[CoachTask], question: &str) -> String {
    let task_data = serde_json::to_string_pretty(tasks).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are a professional productivity coach. Analyze the following time \
         tracking data and answer the user's question.\n\
         The data is in JSON format. Each object represents a task. \
         'durationMinutes' is the time spent on the task.\n\
         Provide a concise, insightful, and helpful response formatted in Markdown.\n\n\
         User's Question: \"{question}\"\n\n\
         My Time Tracking Data:\n```json\n{task_data}\n```\n"
    )
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    error: Option<UpstreamError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: Option<String>,
}

/// Client for the conversational assistant. Takes an owned snapshot of the
/// task list at call time and shares no state with the engine.
pub struct CoachClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl CoachClient {
    pub fn from_env() -> Result<Self, CoachError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(CoachError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: GENERATE_ENDPOINT.to_string(),
        }
    }

    /// Point the client at a different generateContent-compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Ask a free-text question over the given task snapshot. Returns the
    /// markdown answer or a typed failure.
    pub async fn ask(&self, tasks: &[Task], question: &str) -> Result<String, CoachError> {
        let prompt = build_prompt(&simplify_tasks(tasks), question);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_k: 1,
                top_p: 1.0,
                max_output_tokens: 2048,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body: GenerateResponse = response.json().await?;

        if !status.is_success() {
            return Err(CoachError::Upstream {
                status: status.as_u16(),
                message: body
                    .error
                    .and_then(|error| error.message)
                    .unwrap_or_else(|| "request failed".to_string()),
            });
        }

        extract_answer(body)
    }
}

fn extract_answer(body: GenerateResponse) -> Result<String, CoachError> {
    let candidates = body.candidates.unwrap_or_default();
    if candidates.is_empty() {
        if let Some(reason) = body.prompt_feedback.and_then(|feedback| feedback.block_reason) {
            return Err(CoachError::Blocked(reason));
        }
        return Err(CoachError::EmptyResponse);
    }

    let text = candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .and_then(|parts| parts.into_iter().next())
        .and_then(|part| part.text);

    match text {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(CoachError::EmptyResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn sample_task(time_spent_ms: u64) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "deep work".to_string(),
            completed: true,
            time_spent_ms,
            is_active: false,
            created_at: DateTime::parse_from_rfc3339("2026-08-07T12:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn simplify_rounds_to_nearest_minute() {
        let tasks = vec![sample_task(90_000), sample_task(89_999), sample_task(0)];
        let simplified = simplify_tasks(&tasks);
        assert_eq!(simplified[0].duration_minutes, 2);
        assert_eq!(simplified[1].duration_minutes, 1);
        assert_eq!(simplified[2].duration_minutes, 0);
        assert_eq!(simplified[0].date, "2026-08-07");
    }

    #[test]
    fn prompt_embeds_question_and_task_json() {
        let prompt = build_prompt(&simplify_tasks(&[sample_task(120_000)]), "How focused was I?");
        assert!(prompt.contains("User's Question: \"How focused was I?\""));
        assert!(prompt.contains("\"durationMinutes\": 2"));
        assert!(prompt.contains("```json"));
    }

    #[test]
    fn extract_answer_returns_first_candidate_text() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"**Nice week.**"}]}}]}"#,
        )
        .expect("parse response");
        assert_eq!(extract_answer(body).expect("answer"), "**Nice week.**");
    }

    #[test]
    fn extract_answer_maps_block_reason() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#)
                .expect("parse response");
        match extract_answer(body) {
            Err(CoachError::Blocked(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[test]
    fn extract_answer_maps_missing_text_to_empty() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[]}}]}"#)
                .expect("parse response");
        assert!(matches!(extract_answer(body), Err(CoachError::EmptyResponse)));
    }

    #[test]
    fn from_env_requires_a_key() {
        std::env::remove_var(API_KEY_ENV);
        assert!(matches!(
            CoachClient::from_env(),
            Err(CoachError::MissingApiKey)
        ));
    }
}
