use crate::interview::{DifficultyLevel, Question, Response, SessionConfig, Summary};
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

// The `DialogueService` is the network-bound collaborator that writes the
// questions, grades the answers and produces the closing report. The
// orchestrator only depends on this trait, so the same session logic runs
// against an LLM backend, an offline question bank or a mock in tests.
//
// Every method may fail; the orchestrator treats any failure as fatal for the
// session and surfaces the error message on the published state.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DialogueService: Send + Sync {
    async fn generate_initial_question(
        &self,
        topic_id: &str,
        difficulty: DifficultyLevel,
    ) -> Result<Question>;

    async fn generate_follow_up_question(
        &self,
        previous_question_id: &str,
        next_question_id: &str,
        history: &[Response],
        topic_id: &str,
        difficulty: DifficultyLevel,
    ) -> Result<Question>;

    async fn evaluate(
        &self,
        question: &Question,
        answer: &str,
        history: &[Response],
        topic_id: &str,
    ) -> Result<Response>;

    async fn generate_summary(
        &self,
        questions: &[Question],
        responses: &[Response],
        config: &SessionConfig,
    ) -> Result<Summary>;
}
