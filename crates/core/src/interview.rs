use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How hard the questions of a session should be. Variants are ordered from
/// easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyLevel {
    pub fn harder(self) -> Self {
        match self {
            DifficultyLevel::Beginner => DifficultyLevel::Intermediate,
            DifficultyLevel::Intermediate => DifficultyLevel::Advanced,
            DifficultyLevel::Advanced | DifficultyLevel::Expert => DifficultyLevel::Expert,
        }
    }

    pub fn easier(self) -> Self {
        match self {
            DifficultyLevel::Beginner | DifficultyLevel::Intermediate => DifficultyLevel::Beginner,
            DifficultyLevel::Advanced => DifficultyLevel::Intermediate,
            DifficultyLevel::Expert => DifficultyLevel::Advanced,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
            DifficultyLevel::Expert => "expert",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(DifficultyLevel::Beginner),
            "intermediate" => Ok(DifficultyLevel::Intermediate),
            "advanced" => Ok(DifficultyLevel::Advanced),
            "expert" => Ok(DifficultyLevel::Expert),
            other => Err(format!("unknown difficulty level '{other}'")),
        }
    }
}

/// Caller-supplied settings for one interview. Never mutated once a session
/// has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub topic_id: String,
    pub difficulty: DifficultyLevel,
    pub duration_minutes: u32,
    /// Zero means the dialogue service alone decides when to stop.
    pub question_count: u32,
    pub adaptive_feedback: bool,
}

impl SessionConfig {
    pub fn new(topic_id: impl Into<String>, difficulty: DifficultyLevel) -> Self {
        Self {
            topic_id: topic_id.into(),
            difficulty,
            duration_minutes: 30,
            question_count: 5,
            adaptive_feedback: false,
        }
    }

    pub fn with_question_count(mut self, question_count: u32) -> Self {
        self.question_count = question_count;
        self
    }

    pub fn with_duration_minutes(mut self, duration_minutes: u32) -> Self {
        self.duration_minutes = duration_minutes;
        self
    }

    pub fn with_adaptive_feedback(mut self, adaptive_feedback: bool) -> Self {
        self.adaptive_feedback = adaptive_feedback;
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.topic_id.trim().is_empty() {
            return Err(SessionError::InvalidConfig(
                "topic id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub category: String,
    pub difficulty: DifficultyLevel,
    /// Talking points a strong answer is expected to touch on.
    #[serde(default)]
    pub expected_points: Vec<String>,
    #[serde(default = "default_expected_minutes")]
    pub expected_duration_minutes: u32,
}

fn default_expected_minutes() -> u32 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// 1 to 10 inclusive.
    pub score: u8,
    pub feedback_summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub communication_score: Option<u8>,
    #[serde(default)]
    pub technical_score: Option<u8>,
}

/// An answered question together with its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub question_id: String,
    pub answer_text: String,
    pub evaluation: Evaluation,
    /// `None` signals that there are no more questions.
    pub next_question_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub session_id: String,
    pub topic_id: String,
    pub overall_score: f32,
    pub completed_questions_count: usize,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub overview: String,
}

impl Summary {
    /// The summary of a session in which nothing was answered.
    pub fn empty(session_id: &str, config: &SessionConfig) -> Self {
        Self {
            session_id: session_id.to_string(),
            topic_id: config.topic_id.clone(),
            overall_score: 0.0,
            completed_questions_count: 0,
            strengths: vec![],
            improvements: vec!["Answer at least one question to receive feedback.".to_string()],
            recommendations: vec![],
            overview: "No questions were answered in this session.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub difficulty: DifficultyLevel,
    /// Canned questions for offline practice.
    #[serde(default)]
    pub questions: Vec<Question>,
}
