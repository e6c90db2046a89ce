use crate::models::{QuizQuestion, QuizResult};
use anyhow::Context;
use base64::Engine;
use serde::Deserialize;
use std::time::{Duration, Instant};

const GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default advisory timeout for one analysis call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const PROMPT: &str = "\
You are an assistant that answers multiple-choice questions. Analyze this image and:

IMPORTANT: ONLY identify REAL multiple-choice questions:
- Clear format: \"Question 1:\", \"Question 2:\", \"Q1:\", etc.
- Have answer choices: A, B, C, D or True/False
- Are knowledge-testing questions, exams, quizzes

DO NOT identify:
- Code, programming commands
- Text editor, terminal, console
- Task lists, notes
- Regular text that is not quiz questions

If NO real quiz questions found, return:
{
  \"questions\": []
}

If questions found, return JSON:
{
  \"questions\": [
    {
      \"number\": \"1\",
      \"question\": \"Question content\",
      \"answer\": \"A\"
    }
  ]
}

Return only JSON, no other text.";

/// The complete outcome contract of one analysis call. `NoQuestions` is the
/// soft outcome: the service answered but found nothing worth reporting.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("no questions found in image")]
    NoQuestions,
    #[error("service did not respond within {limit:?} (took {elapsed:?})")]
    Timeout { elapsed: Duration, limit: Duration },
    #[error("response could not be interpreted: {0}")]
    Parse(String),
    #[error("analysis call failed: {0}")]
    Api(String),
}

/// Boundary with the analysis service. The worker pool switches on exactly
/// these four failure kinds.
pub trait QuizAnalyzer: Send + Sync {
    fn analyze(&self, image_png: &[u8]) -> Result<QuizResult, AnalyzeError>;
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct QuestionsPayload {
    questions: Vec<serde_json::Value>,
}

/// Blocking Gemini client. Only worker-pool threads call into this.
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("Gemini API key must not be empty");
        }
        // The transport timeout sits above the advisory one so a slow but
        // eventually successful call is flagged as late rather than aborted.
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout + Duration::from_secs(5))
            .user_agent("quizlens")
            .build()
            .context("building http client")?;
        Ok(Self {
            client,
            api_key,
            timeout,
        })
    }

    pub fn from_env(timeout: Duration) -> anyhow::Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY not set; export it before starting")?;
        Self::new(api_key, timeout)
    }

    fn request_body(&self, image_png: &[u8]) -> serde_json::Value {
        let data = base64::engine::general_purpose::STANDARD.encode(image_png);
        serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": PROMPT },
                    { "inline_data": { "mime_type": "image/png", "data": data } }
                ]
            }]
        })
    }

    fn extract_text(response: GeminiResponse) -> Result<String, AnalyzeError> {
        response
            .candidates
            .into_iter()
            .flatten()
            .filter_map(|c| c.content)
            .filter_map(|c| c.parts)
            .flatten()
            .filter_map(|p| p.text)
            .next()
            .ok_or_else(|| AnalyzeError::Parse("response contained no text part".into()))
    }
}

impl QuizAnalyzer for GeminiClient {
    fn analyze(&self, image_png: &[u8]) -> Result<QuizResult, AnalyzeError> {
        let url = format!(
            "{GEMINI_ENDPOINT}/{GEMINI_MODEL}:generateContent?key={}",
            self.api_key
        );
        tracing::info!(bytes = image_png.len(), "sending capture to Gemini");

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&self.request_body(image_png))
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    AnalyzeError::Timeout {
                        elapsed: start.elapsed(),
                        limit: self.timeout,
                    }
                } else {
                    AnalyzeError::Api(err.to_string())
                }
            })?;
        let elapsed = start.elapsed();

        // Advisory timeout: the call is not cancelled mid-flight, only
        // flagged as late once it returns.
        if elapsed > self.timeout {
            tracing::error!(?elapsed, "Gemini call exceeded timeout");
            return Err(AnalyzeError::Timeout {
                elapsed,
                limit: self.timeout,
            });
        }

        if !response.status().is_success() {
            return Err(AnalyzeError::Api(format!(
                "Gemini returned HTTP {}",
                response.status()
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .map_err(|err| AnalyzeError::Parse(err.to_string()))?;
        let text = Self::extract_text(parsed)?;
        tracing::info!(?elapsed, "received Gemini response");

        parse_result_text(&text)
    }
}

/// Parse the model's reply into a [`QuizResult`].
///
/// Markdown code fences around the JSON are tolerated. Question entries
/// missing a required field are skipped; an entirely empty set is the soft
/// [`AnalyzeError::NoQuestions`] outcome.
pub fn parse_result_text(text: &str) -> Result<QuizResult, AnalyzeError> {
    let cleaned = strip_code_fences(text);

    let payload: QuestionsPayload = serde_json::from_str(cleaned)
        .map_err(|err| AnalyzeError::Parse(format!("response not valid JSON: {err}")))?;

    let mut questions = Vec::new();
    for entry in payload.questions {
        let number = entry.get("number");
        let question = entry.get("question").and_then(|v| v.as_str());
        let answer = entry.get("answer").and_then(|v| v.as_str());
        match (number, question, answer) {
            (Some(number), Some(question), Some(answer)) => {
                // Numbers occasionally come back as JSON integers.
                let number = match number.as_str() {
                    Some(s) => s.to_string(),
                    None => number.to_string(),
                };
                questions.push(QuizQuestion {
                    number,
                    question: question.to_string(),
                    answer: answer.to_string(),
                });
            }
            _ => tracing::error!(?entry, "question entry missing required fields"),
        }
    }

    if questions.is_empty() {
        return Err(AnalyzeError::NoQuestions);
    }

    tracing::info!(count = questions.len(), "parsed questions from response");
    Ok(QuizResult::new(questions))
}

fn strip_code_fences(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parses_fenced_questions() {
        let text = "```json\n{\"questions\": [{\"number\": \"2\", \"question\": \"Pick one\", \"answer\": \"B\"}]}\n```";
        let result = parse_result_text(text).unwrap();
        assert_eq!(result.total_questions, 1);
        assert_eq!(result.questions[0].number, "2");
        assert_eq!(result.questions[0].answer, "B");
    }

    #[test]
    fn integer_numbers_are_accepted() {
        let text = r#"{"questions": [{"number": 7, "question": "q", "answer": "C"}]}"#;
        let result = parse_result_text(text).unwrap();
        assert_eq!(result.questions[0].number, "7");
    }

    #[test]
    fn incomplete_entries_are_skipped() {
        let text = r#"{"questions": [
            {"number": "1", "question": "ok", "answer": "A"},
            {"number": "2", "question": "missing answer"}
        ]}"#;
        let result = parse_result_text(text).unwrap();
        assert_eq!(result.total_questions, 1);
    }

    #[test]
    fn empty_set_is_the_soft_outcome() {
        assert!(matches!(
            parse_result_text(r#"{"questions": []}"#),
            Err(AnalyzeError::NoQuestions)
        ));
    }

    #[test]
    fn non_json_reply_is_a_parse_error() {
        assert!(matches!(
            parse_result_text("I could not find any questions."),
            Err(AnalyzeError::Parse(_))
        ));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(GeminiClient::new("  ".into(), DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    #[serial]
    fn from_env_requires_the_key() {
        std::env::remove_var("GEMINI_API_KEY");
        assert!(GeminiClient::from_env(DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    #[serial]
    fn from_env_reads_the_key() {
        std::env::set_var("GEMINI_API_KEY", "test-key");
        assert!(GeminiClient::from_env(DEFAULT_TIMEOUT).is_ok());
        std::env::remove_var("GEMINI_API_KEY");
    }

    #[test]
    fn strips_json_fence() {
        assert_eq!(
            strip_code_fences("```json\n{\"questions\": []}\n```"),
            "{\"questions\": []}"
        );
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn leaves_plain_json_alone() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }
}
