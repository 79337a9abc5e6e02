use crate::interview::Topic;
use anyhow::{Context, Result};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use std::path::Path;

/// Minimum skim score for a query to count as naming a topic.
const MATCH_THRESHOLD: i64 = 30;

// The practice topics a user can pick from, loaded from a JSON array.
pub struct TopicCatalog {
    topics: Vec<Topic>,
    matcher: SkimMatcherV2,
}

impl TopicCatalog {
    pub fn new(topics: Vec<Topic>) -> Self {
        Self {
            topics,
            matcher: SkimMatcherV2::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let topics: Vec<Topic> =
            serde_json::from_str(json).context("Failed to parse topic catalog")?;
        Ok(Self::new(topics))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read topic catalog {}", path.display()))?;
        let catalog = Self::from_json_str(&json)?;
        tracing::info!(
            "Loaded {} topic(s) from {}",
            catalog.topics.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn list_topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.id == id)
    }

    /// Resolves free text to a topic: an exact id first, then the best fuzzy
    /// match against names and ids.
    pub fn find(&self, query: &str) -> Option<&Topic> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        if let Some(topic) = self.topics.iter().find(|t| t.id.to_lowercase() == query) {
            return Some(topic);
        }
        self.topics
            .iter()
            .filter_map(|topic| {
                let by_name = self
                    .matcher
                    .fuzzy_match(&topic.name.to_lowercase(), &query);
                let by_id = self.matcher.fuzzy_match(&topic.id.to_lowercase(), &query);
                by_name.max(by_id).map(|score| (score, topic))
            })
            .filter(|(score, _)| *score > MATCH_THRESHOLD)
            .max_by_key(|(score, _)| *score)
            .map(|(_, topic)| topic)
    }
}
