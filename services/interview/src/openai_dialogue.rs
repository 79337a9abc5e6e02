use crate::prompt_loader::{
    EVALUATE_ANSWER, FOLLOW_UP_QUESTION, INITIAL_QUESTION, PromptSet, SUMMARIZE_SESSION,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use interview_core::{
    DialogueService, DifficultyLevel, Evaluation, Question, Response, SessionConfig, Summary,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: String,
}

// What the model returns for a question. Everything except the text is
// optional; gaps are filled from the request.
#[derive(Debug, Deserialize)]
struct QuestionOut {
    #[serde(alias = "question")]
    text: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    expected_points: Vec<String>,
    #[serde(default)]
    expected_duration_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EvaluationOut {
    score: f64,
    feedback_summary: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    communication_score: Option<f64>,
    #[serde(default)]
    technical_score: Option<f64>,
    #[serde(default = "keep_going", rename = "continue")]
    keep_going: bool,
}

fn keep_going() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SummaryOut {
    overall_score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    overview: String,
}

/// A `DialogueService` backed by the OpenAI chat-completions API.
pub struct OpenAiDialogue {
    client: Client,
    api_key: SecretString,
    model: String,
    prompts: PromptSet,
}

impl OpenAiDialogue {
    pub fn new(api_key: SecretString, model: String, prompts: PromptSet) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            prompts,
        }
    }

    async fn complete_json(&self, prompt: String, temperature: f32) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "response_format": { "type": "json_object" },
            "temperature": temperature
        });

        let resp = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("Chat completion request failed")?
            .error_for_status()
            .context("Chat completion returned an error status")?
            .json::<LlmResponse>()
            .await
            .context("Chat completion response was not valid JSON")?;

        let answer = &resp
            .choices
            .first()
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?
            .message
            .content;
        tracing::debug!("LLM replied: {}", answer);
        Ok(answer.clone())
    }
}

#[async_trait]
impl DialogueService for OpenAiDialogue {
    async fn generate_initial_question(
        &self,
        topic_id: &str,
        difficulty: DifficultyLevel,
    ) -> Result<Question> {
        let prompt = self.prompts.render(
            INITIAL_QUESTION,
            &[("topic", topic_id), ("difficulty", difficulty.as_str())],
        )?;
        let content = self.complete_json(prompt, 0.7).await?;
        parse_question(&content, "q1", difficulty)
    }

    async fn generate_follow_up_question(
        &self,
        previous_question_id: &str,
        next_question_id: &str,
        history: &[Response],
        topic_id: &str,
        difficulty: DifficultyLevel,
    ) -> Result<Question> {
        tracing::debug!(
            "Requesting follow-up {} after {}",
            next_question_id,
            previous_question_id
        );
        let history = format_history(history);
        let prompt = self.prompts.render(
            FOLLOW_UP_QUESTION,
            &[
                ("topic", topic_id),
                ("difficulty", difficulty.as_str()),
                ("history", history.as_str()),
            ],
        )?;
        let content = self.complete_json(prompt, 0.7).await?;
        parse_question(&content, next_question_id, difficulty)
    }

    async fn evaluate(
        &self,
        question: &Question,
        answer: &str,
        history: &[Response],
        topic_id: &str,
    ) -> Result<Response> {
        let expected_points = question.expected_points.join("; ");
        let formatted = format_history(history);
        let prompt = self.prompts.render(
            EVALUATE_ANSWER,
            &[
                ("topic", topic_id),
                ("question", question.text.as_str()),
                ("expected_points", expected_points.as_str()),
                ("answer", answer),
                ("history", formatted.as_str()),
            ],
        )?;
        // Low temperature for consistent grading.
        let content = self.complete_json(prompt, 0.2).await?;
        parse_evaluation(&content, question, answer, history.len())
    }

    async fn generate_summary(
        &self,
        questions: &[Question],
        responses: &[Response],
        config: &SessionConfig,
    ) -> Result<Summary> {
        let history = format_transcript(questions, responses);
        let prompt = self.prompts.render(
            SUMMARIZE_SESSION,
            &[
                ("topic", config.topic_id.as_str()),
                ("difficulty", config.difficulty.as_str()),
                ("history", history.as_str()),
            ],
        )?;
        let content = self.complete_json(prompt, 0.3).await?;
        parse_summary(&content, config, responses.len())
    }
}

fn clamp_score(score: f64) -> u8 {
    score.round().clamp(1.0, 10.0) as u8
}

fn parse_question(content: &str, id: &str, difficulty: DifficultyLevel) -> Result<Question> {
    let out: QuestionOut = serde_json::from_str(content)
        .with_context(|| format!("Invalid question format: {content}"))?;
    if out.text.trim().is_empty() {
        anyhow::bail!("LLM returned an empty question");
    }
    Ok(Question {
        id: id.to_string(),
        text: out.text.trim().to_string(),
        category: out.category.unwrap_or_default(),
        difficulty: out
            .difficulty
            .and_then(|d| d.parse().ok())
            .unwrap_or(difficulty),
        expected_points: out.expected_points,
        expected_duration_minutes: out.expected_duration_minutes.unwrap_or(3),
    })
}

/// `answered_before` is the number of responses recorded before this one and
/// decides the id proposed for the next question.
fn parse_evaluation(
    content: &str,
    question: &Question,
    answer: &str,
    answered_before: usize,
) -> Result<Response> {
    let out: EvaluationOut = serde_json::from_str(content)
        .with_context(|| format!("Invalid evaluation format: {content}"))?;
    let next_question_id = out
        .keep_going
        .then(|| format!("q{}", answered_before + 2));
    Ok(Response {
        question_id: question.id.clone(),
        answer_text: answer.to_string(),
        evaluation: Evaluation {
            score: clamp_score(out.score),
            feedback_summary: out.feedback_summary,
            strengths: out.strengths,
            improvements: out.improvements,
            resources: out.resources,
            communication_score: out.communication_score.map(clamp_score),
            technical_score: out.technical_score.map(clamp_score),
        },
        next_question_id,
    })
}

fn parse_summary(content: &str, config: &SessionConfig, answered: usize) -> Result<Summary> {
    let out: SummaryOut = serde_json::from_str(content)
        .with_context(|| format!("Invalid summary format: {content}"))?;
    Ok(Summary {
        // Assigned by the session.
        session_id: String::new(),
        topic_id: config.topic_id.clone(),
        overall_score: out.overall_score.clamp(0.0, 10.0) as f32,
        completed_questions_count: answered,
        strengths: out.strengths,
        improvements: out.improvements,
        recommendations: out.recommendations,
        overview: out.overview,
    })
}

fn format_history(history: &[Response]) -> String {
    if history.is_empty() {
        return "(nothing answered yet)".to_string();
    }
    history
        .iter()
        .map(|r| {
            format!(
                "- [{}] answer: \"{}\" (scored {}/10: {})",
                r.question_id, r.answer_text, r.evaluation.score, r.evaluation.feedback_summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_transcript(questions: &[Question], responses: &[Response]) -> String {
    questions
        .iter()
        .zip(responses)
        .map(|(q, r)| {
            format!(
                "Q: {}\nA: {}\nScore: {}/10. {}",
                q.text, r.answer_text, r.evaluation.score, r.evaluation.feedback_summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn question() -> Question {
        Question {
            id: "q1".to_string(),
            text: "What is a coroutine scope?".to_string(),
            category: "Concurrency".to_string(),
            difficulty: DifficultyLevel::Intermediate,
            expected_points: vec!["lifecycle".to_string(), "cancellation".to_string()],
            expected_duration_minutes: 3,
        }
    }

    #[test]
    fn test_parse_question_fills_gaps() {
        let content = r#"{"question": "  Explain structured concurrency. ", "expected_points": ["scopes"]}"#;

        let question = parse_question(content, "q3", DifficultyLevel::Advanced).unwrap();

        assert_eq!(question.id, "q3");
        assert_eq!(question.text, "Explain structured concurrency.");
        assert_eq!(question.difficulty, DifficultyLevel::Advanced);
        assert_eq!(question.expected_points, vec!["scopes"]);
        assert_eq!(question.expected_duration_minutes, 3);
    }

    #[test]
    fn test_parse_question_rejects_garbage() {
        assert!(parse_question("not json", "q1", DifficultyLevel::Beginner).is_err());
        assert!(parse_question(r#"{"text": " "}"#, "q1", DifficultyLevel::Beginner).is_err());
    }

    #[test]
    fn test_parse_evaluation_clamps_scores_and_picks_next_id() {
        // --- Arrange ---
        let content = r#"{
            "score": 12,
            "feedback_summary": "Good grasp of scopes.",
            "strengths": ["clear"],
            "communication_score": 0.4,
            "technical_score": 7.6
        }"#;

        // --- Act ---
        let response = parse_evaluation(content, &question(), "It bounds coroutines", 1).unwrap();

        // --- Assert ---
        assert_eq!(response.question_id, "q1");
        assert_eq!(response.answer_text, "It bounds coroutines");
        assert_eq!(response.evaluation.score, 10);
        assert_eq!(response.evaluation.communication_score, Some(1));
        assert_eq!(response.evaluation.technical_score, Some(8));
        assert_eq!(response.next_question_id.as_deref(), Some("q3"));
    }

    #[test]
    fn test_parse_evaluation_can_end_the_interview() {
        let content = r#"{"score": 6, "feedback_summary": "Fine.", "continue": false}"#;

        let response = parse_evaluation(content, &question(), "answer", 0).unwrap();

        assert!(response.next_question_id.is_none());
    }

    #[test]
    fn test_parse_summary_counts_answers() {
        let config = SessionConfig::new("kotlin", DifficultyLevel::Advanced);
        let content = r#"{"overall_score": 7.5, "strengths": ["depth"], "overview": "Strong."}"#;

        let summary = parse_summary(content, &config, 4).unwrap();

        assert_eq!(summary.topic_id, "kotlin");
        assert_eq!(summary.completed_questions_count, 4);
        assert_eq!(summary.overall_score, 7.5);
        assert_eq!(summary.overview, "Strong.");
    }

    #[test]
    fn test_format_history() {
        assert_eq!(format_history(&[]), "(nothing answered yet)");
        let content = r#"{"score": 6, "feedback_summary": "Fine."}"#;
        let response = parse_evaluation(content, &question(), "It bounds coroutines", 0).unwrap();
        assert_eq!(
            format_history(&[response]),
            "- [q1] answer: \"It bounds coroutines\" (scored 6/10: Fine.)"
        );
    }

    // This is an integration test that makes a live call to the OpenAI API.
    // It is ignored by default to allow `cargo test` to run without requiring a live
    // API key. To run this test, use `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_live_question_and_evaluation() {
        dotenvy::dotenv_override().ok();
        let api_key = env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let prompts = PromptSet::load(std::path::Path::new(crate::config::DEFAULT_PROMPTS_DIR))
            .expect("prompts should load");
        let dialogue = OpenAiDialogue::new(api_key.into(), "gpt-4o".to_string(), prompts);

        let question = dialogue
            .generate_initial_question("Android Development", DifficultyLevel::Beginner)
            .await
            .expect("question generation failed");
        println!("Question: {:?}", question);
        assert_eq!(question.id, "q1");

        let response = dialogue
            .evaluate(
                &question,
                "I am not sure, I have never used Android.",
                &[],
                "Android Development",
            )
            .await
            .expect("evaluation failed");
        println!("Evaluation: {:?}", response.evaluation);
        assert!(response.evaluation.score <= 5);
    }
}
