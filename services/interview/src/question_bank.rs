use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use interview_core::{
    DialogueService, DifficultyLevel, Evaluation, Question, Response, SessionConfig, Summary,
    Topic, TopicCatalog,
};
use std::collections::HashSet;

/// Words shorter than this are ignored when matching talking points.
const MIN_KEYWORD_LEN: usize = 4;

/// An offline `DialogueService` that serves the canned questions of the topic
/// catalog and grades answers by how many expected talking points they touch.
pub struct QuestionBankDialogue {
    catalog: TopicCatalog,
}

impl QuestionBankDialogue {
    pub fn new(catalog: TopicCatalog) -> Self {
        Self { catalog }
    }

    fn topic(&self, topic_id: &str) -> Result<&Topic> {
        let topic = self
            .catalog
            .get(topic_id)
            .with_context(|| format!("Unknown topic: {topic_id}"))?;
        if topic.questions.is_empty() {
            bail!("Topic '{}' has no questions in its bank", topic.name);
        }
        Ok(topic)
    }

    /// The first unasked question at `difficulty`, or the first unasked one
    /// at any level.
    fn pick<'a>(
        topic: &'a Topic,
        difficulty: DifficultyLevel,
        asked: &HashSet<&str>,
    ) -> Option<&'a Question> {
        let mut unasked = topic
            .questions
            .iter()
            .filter(|q| !asked.contains(q.id.as_str()));
        let first = unasked.clone().next();
        unasked.find(|q| q.difficulty == difficulty).or(first)
    }
}

#[async_trait]
impl DialogueService for QuestionBankDialogue {
    async fn generate_initial_question(
        &self,
        topic_id: &str,
        difficulty: DifficultyLevel,
    ) -> Result<Question> {
        let topic = self.topic(topic_id)?;
        Self::pick(topic, difficulty, &HashSet::new())
            .cloned()
            .context("Question bank is empty")
    }

    async fn generate_follow_up_question(
        &self,
        previous_question_id: &str,
        next_question_id: &str,
        history: &[Response],
        topic_id: &str,
        difficulty: DifficultyLevel,
    ) -> Result<Question> {
        let topic = self.topic(topic_id)?;
        let mut asked: HashSet<&str> = history.iter().map(|r| r.question_id.as_str()).collect();
        asked.insert(previous_question_id);

        let proposed = topic.questions.iter().find(|q| q.id == next_question_id);
        match proposed {
            Some(question) if question.difficulty == difficulty => Ok(question.clone()),
            _ => Self::pick(topic, difficulty, &asked)
                .or(proposed)
                .cloned()
                .with_context(|| format!("No question left after {previous_question_id}")),
        }
    }

    async fn evaluate(
        &self,
        question: &Question,
        answer: &str,
        history: &[Response],
        topic_id: &str,
    ) -> Result<Response> {
        let topic = self.topic(topic_id)?;
        let (covered, missed) = coverage(&question.expected_points, answer);
        let score = score(covered.len(), missed.len(), answer);
        let feedback_summary = if covered.len() + missed.len() == 0 {
            format!("Thanks. That answer scores {score} out of 10.")
        } else if missed.is_empty() {
            format!("Excellent, you covered every key point. {score} out of 10.")
        } else {
            format!(
                "You covered {} of {} key points. Next time also mention {}. {} out of 10.",
                covered.len(),
                covered.len() + missed.len(),
                missed.join(", "),
                score
            )
        };

        let mut asked: HashSet<&str> = history.iter().map(|r| r.question_id.as_str()).collect();
        asked.insert(question.id.as_str());
        let next_question_id = topic
            .questions
            .iter()
            .find(|q| !asked.contains(q.id.as_str()))
            .map(|q| q.id.clone());

        Ok(Response {
            question_id: question.id.clone(),
            answer_text: answer.to_string(),
            evaluation: Evaluation {
                score,
                feedback_summary,
                strengths: covered,
                improvements: missed,
                resources: vec![],
                communication_score: None,
                technical_score: Some(score),
            },
            next_question_id,
        })
    }

    async fn generate_summary(
        &self,
        questions: &[Question],
        responses: &[Response],
        config: &SessionConfig,
    ) -> Result<Summary> {
        if responses.is_empty() {
            bail!("Cannot summarize a session without responses");
        }
        let total: u32 = responses.iter().map(|r| r.evaluation.score as u32).sum();
        let overall_score = total as f32 / responses.len() as f32;

        let mut strengths = vec![];
        let mut improvements = vec![];
        for (question, response) in questions.iter().zip(responses) {
            if response.evaluation.score >= 7 {
                strengths.push(format!("Strong answer to \"{}\"", question.text));
            } else if response.evaluation.score <= 4 {
                improvements.push(format!("Revisit \"{}\"", question.text));
            }
        }
        let recommendations = responses
            .iter()
            .flat_map(|r| r.evaluation.improvements.iter())
            .map(|point| format!("Practice explaining {point}"))
            .collect();

        Ok(Summary {
            session_id: String::new(),
            topic_id: config.topic_id.clone(),
            overall_score,
            completed_questions_count: responses.len(),
            strengths,
            improvements,
            recommendations,
            overview: format!(
                "You answered {} question(s) on {} with an average score of {:.1}.",
                responses.len(),
                config.topic_id,
                overall_score
            ),
        })
    }
}

/// Splits the expected points into the ones the answer touched and the ones
/// it missed. A point counts as touched when any of its longer words appears
/// in the answer.
fn coverage(expected_points: &[String], answer: &str) -> (Vec<String>, Vec<String>) {
    let answer = answer.to_lowercase();
    let spoken: HashSet<&str> = answer
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    expected_points.iter().cloned().partition(|point| {
        point
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= MIN_KEYWORD_LEN)
            .any(|w| spoken.contains(w))
    })
}

fn score(covered: usize, missed: usize, answer: &str) -> u8 {
    let total = covered + missed;
    if answer.trim().is_empty() {
        1
    } else if total == 0 {
        5
    } else {
        (1.0 + 9.0 * covered as f32 / total as f32).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {
            "id": "android",
            "name": "Android Development",
            "difficulty": "intermediate",
            "questions": [
                {"id": "a1", "text": "What is an Activity?", "difficulty": "beginner",
                 "expected_points": ["single screen", "lifecycle callbacks"]},
                {"id": "a2", "text": "How does a ViewModel survive rotation?", "difficulty": "intermediate",
                 "expected_points": ["ViewModelStore", "configuration change"]},
                {"id": "a3", "text": "Explain Binder IPC.", "difficulty": "expert",
                 "expected_points": ["kernel driver", "parcel"]}
            ]
        },
        {"id": "empty", "name": "Empty", "difficulty": "beginner"}
    ]"#;

    fn dialogue() -> QuestionBankDialogue {
        QuestionBankDialogue::new(TopicCatalog::from_json_str(CATALOG).unwrap())
    }

    fn answered(question_id: &str, score: u8) -> Response {
        Response {
            question_id: question_id.to_string(),
            answer_text: "something".to_string(),
            evaluation: Evaluation {
                score,
                feedback_summary: String::new(),
                strengths: vec![],
                improvements: vec!["parcel".to_string()],
                resources: vec![],
                communication_score: None,
                technical_score: None,
            },
            next_question_id: None,
        }
    }

    #[tokio::test]
    async fn test_initial_question_prefers_requested_difficulty() {
        let dialogue = dialogue();

        let question = dialogue
            .generate_initial_question("android", DifficultyLevel::Intermediate)
            .await
            .unwrap();
        assert_eq!(question.id, "a2");

        // No advanced question exists, so the bank order wins.
        let question = dialogue
            .generate_initial_question("android", DifficultyLevel::Advanced)
            .await
            .unwrap();
        assert_eq!(question.id, "a1");
    }

    #[tokio::test]
    async fn test_unknown_or_empty_topics_fail() {
        let dialogue = dialogue();

        let unknown = dialogue
            .generate_initial_question("cobol", DifficultyLevel::Beginner)
            .await;
        let empty = dialogue
            .generate_initial_question("empty", DifficultyLevel::Beginner)
            .await;

        assert!(unknown.unwrap_err().to_string().contains("Unknown topic"));
        assert!(empty.is_err());
    }

    #[tokio::test]
    async fn test_evaluate_scores_by_talking_points() {
        // --- Arrange ---
        let dialogue = dialogue();
        let question = dialogue
            .generate_initial_question("android", DifficultyLevel::Beginner)
            .await
            .unwrap();

        // --- Act ---
        let response = dialogue
            .evaluate(
                &question,
                "An Activity is a single screen of the app.",
                &[],
                "android",
            )
            .await
            .unwrap();

        // --- Assert ---
        assert_eq!(response.question_id, "a1");
        assert_eq!(response.evaluation.strengths, vec!["single screen"]);
        assert_eq!(response.evaluation.improvements, vec!["lifecycle callbacks"]);
        // One of two points: 1 + 4.5, rounded.
        assert_eq!(response.evaluation.score, 6);
        assert!(
            response
                .evaluation
                .feedback_summary
                .contains("lifecycle callbacks")
        );
        assert_eq!(response.next_question_id.as_deref(), Some("a2"));
    }

    #[tokio::test]
    async fn test_last_question_has_no_successor() {
        let dialogue = dialogue();
        let topic = dialogue.topic("android").unwrap();
        let last = topic.questions[2].clone();

        let response = dialogue
            .evaluate(
                &last,
                "The kernel driver copies each parcel once.",
                &[answered("a1", 5), answered("a2", 5)],
                "android",
            )
            .await
            .unwrap();

        assert_eq!(response.evaluation.score, 10);
        assert!(response.next_question_id.is_none());
    }

    #[tokio::test]
    async fn test_follow_up_skips_asked_questions_when_difficulty_changes() {
        let dialogue = dialogue();

        // a2 is intermediate, so an expert session gets a3 instead.
        let question = dialogue
            .generate_follow_up_question(
                "a1",
                "a2",
                &[answered("a1", 9)],
                "android",
                DifficultyLevel::Expert,
            )
            .await
            .unwrap();
        assert_eq!(question.id, "a3");

        let question = dialogue
            .generate_follow_up_question(
                "a1",
                "a2",
                &[answered("a1", 5)],
                "android",
                DifficultyLevel::Intermediate,
            )
            .await
            .unwrap();
        assert_eq!(question.id, "a2");
    }

    #[tokio::test]
    async fn test_summary_averages_scores() {
        let dialogue = dialogue();
        let topic = dialogue.topic("android").unwrap();
        let config = SessionConfig::new("android", DifficultyLevel::Beginner);

        let summary = dialogue
            .generate_summary(
                &topic.questions[..2],
                &[answered("a1", 8), answered("a2", 3)],
                &config,
            )
            .await
            .unwrap();

        assert_eq!(summary.completed_questions_count, 2);
        assert_eq!(summary.overall_score, 5.5);
        assert_eq!(summary.strengths.len(), 1);
        assert_eq!(summary.improvements.len(), 1);
        assert_eq!(summary.recommendations.len(), 2);
    }

    #[tokio::test]
    async fn test_shipped_catalog_serves_every_topic() {
        let path = std::path::Path::new(crate::config::DEFAULT_TOPICS_PATH);
        let catalog = TopicCatalog::load(path).unwrap();
        let ids: Vec<String> = catalog.list_topics().iter().map(|t| t.id.clone()).collect();
        let dialogue = QuestionBankDialogue::new(catalog);

        for id in ids {
            let question = dialogue
                .generate_initial_question(&id, DifficultyLevel::Intermediate)
                .await
                .unwrap();
            assert!(!question.expected_points.is_empty(), "{id} has no talking points");
        }
    }
}
