use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use assess_core::model::QuestionDraft;

use super::{GenerationRequest, QuestionGenerator, check_drafts};
use crate::config::GeneratorConfig;
use crate::error::GenerationError;

const SYSTEM_PROMPT: &str = r#"You write assessment questions.
Reply with a single JSON object and nothing else:
{"questions":[{"text":"...","kind":"multiple_choice|true_false|short_answer|essay","choices":["..."],"correct_answer":"...","points":1}]}
Rules:
- multiple_choice: 2 to 6 distinct choices; correct_answer is copied exactly from choices.
- true_false: no choices; correct_answer is "true" or "false".
- short_answer and essay: no choices; correct_answer is the exact expected text.
- points is an integer >= 1."#;

/// Generates questions through an OpenAI-compatible chat-completions API.
#[derive(Clone)]
pub struct ChatQuestionGenerator {
    client: Client,
    config: Option<GeneratorConfig>,
}

impl ChatQuestionGenerator {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GeneratorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GeneratorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    fn user_prompt(request: &GenerationRequest) -> String {
        format!(
            "Write {} {} questions about: {}",
            request.count, request.difficulty, request.topic
        )
    }
}

#[async_trait]
impl QuestionGenerator for ChatQuestionGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::user_prompt(request),
                },
            ],
            temperature: 0.2,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .timeout(config.request_timeout)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), model = %config.model, "question generation failed");
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        let drafts = parse_questions(&content, request.count)?;
        tracing::info!(
            model = %config.model,
            elapsed = ?started.elapsed(),
            questions = drafts.len(),
            "questions generated"
        );
        Ok(drafts)
    }
}

/// Parse the model's reply, tolerating a Markdown code fence around it.
///
/// Keeps at most `limit` drafts.
fn parse_questions(content: &str, limit: usize) -> Result<Vec<QuestionDraft>, GenerationError> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    let parsed: GeneratedQuestions =
        serde_json::from_str(json).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    let mut drafts = parsed.questions;
    if drafts.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    drafts.truncate(limit);
    check_drafts(&drafts)?;
    Ok(drafts)
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestions {
    questions: Vec<QuestionDraft>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::Difficulty;
    use assess_core::model::QuestionKind;

    #[test]
    fn parses_fenced_json_and_truncates() {
        let content = r#"```json
{"questions":[
  {"text":"2+2?","kind":"multiple_choice","choices":["3","4"],"correct_answer":"4","points":1},
  {"text":"Water is wet","kind":"true_false","correct_answer":"true"},
  {"text":"Extra","kind":"short_answer","correct_answer":"x"}
]}
```"#;
        let drafts = parse_questions(content, 2).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].kind, QuestionKind::MultipleChoice);
        assert_eq!(drafts[1].points, 1);
    }

    #[test]
    fn rejects_invalid_drafts() {
        let content = r#"{"questions":[{"text":"Pick","kind":"multiple_choice","choices":["a","b"],"correct_answer":"c"}]}"#;
        assert!(matches!(
            parse_questions(content, 5),
            Err(GenerationError::Question(_))
        ));
        assert!(matches!(
            parse_questions("not json", 5),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn disabled_without_config() {
        let generator = ChatQuestionGenerator::new(None);
        assert!(!generator.enabled());
        let request = GenerationRequest::new("Rust", Difficulty::Beginner, 1).unwrap();
        assert!(matches!(
            generator.generate(&request).await,
            Err(GenerationError::Disabled)
        ));
    }
}
