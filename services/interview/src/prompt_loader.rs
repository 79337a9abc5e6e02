use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const INITIAL_QUESTION: &str = "initial_question";
pub const FOLLOW_UP_QUESTION: &str = "follow_up_question";
pub const EVALUATE_ANSWER: &str = "evaluate_answer";
pub const SUMMARIZE_SESSION: &str = "summarize_session";

const REQUIRED: [&str; 4] = [
    INITIAL_QUESTION,
    FOLLOW_UP_QUESTION,
    EVALUATE_ANSWER,
    SUMMARIZE_SESSION,
];

pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            prompts.insert(prompt_key, content);
        }
    }

    Ok(prompts)
}

/// The templates the OpenAI dialogue needs, checked up front so a missing
/// file fails at startup rather than mid-interview.
#[derive(Debug, Clone)]
pub struct PromptSet {
    templates: HashMap<String, String>,
}

impl PromptSet {
    pub fn new(templates: HashMap<String, String>) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED
            .into_iter()
            .filter(|key| !templates.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            bail!("Missing prompt template(s): {}", missing.join(", "));
        }
        Ok(Self { templates })
    }

    pub fn load(dir_path: &Path) -> Result<Self> {
        Self::new(load_prompts(dir_path)?)
    }

    /// Fills `{name}` placeholders in the template `key`. Unknown placeholders
    /// are left as they are.
    pub fn render(&self, key: &str, values: &[(&str, &str)]) -> Result<String> {
        let template = self
            .templates
            .get(key)
            .with_context(|| format!("Unknown prompt template: {key}"))?;
        let mut rendered = template.clone();
        for (name, value) in values {
            rendered = rendered.replace(&format!("{{{name}}}"), value);
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_required(dir: &Path) -> Result<()> {
        for key in REQUIRED {
            let mut file = File::create(dir.join(format!("{key}.md")))?;
            writeln!(file, "Template {key} for {{topic}}")?;
        }
        Ok(())
    }

    #[test]
    fn test_load_prompts_successfully() -> Result<()> {
        // --- Arrange ---
        let dir = tempdir()?;
        let dir_path = dir.path();

        // The `{{...}}` in `writeln!` escapes the braces, so `{topic}` is written to the file.
        let mut file1 = File::create(dir_path.join("initial_question.md"))?;
        writeln!(file1, "Ask about {{topic}}.")?;

        let mut ignored_file = File::create(dir_path.join("notes.txt"))?;
        writeln!(ignored_file, "not a prompt")?;

        std::fs::create_dir(dir_path.join("subdir"))?;

        // --- Act ---
        let prompts = load_prompts(dir_path)?;

        // --- Assert ---
        assert_eq!(prompts.len(), 1, "Should only load .md files");
        assert_eq!(
            prompts.get("initial_question").unwrap(),
            "Ask about {topic}.\n"
        );
        assert!(prompts.get("notes").is_none());

        Ok(())
    }

    #[test]
    fn test_load_prompts_from_nonexistent_dir() {
        let dir_path = Path::new("nonexistent_dir_for_testing_prompts");

        let result = load_prompts(dir_path);

        assert!(result.is_err());
    }

    #[test]
    fn test_prompt_set_requires_every_template() -> Result<()> {
        let dir = tempdir()?;
        let mut file = File::create(dir.path().join("initial_question.md"))?;
        writeln!(file, "Ask about {{topic}}.")?;

        let error = PromptSet::load(dir.path()).unwrap_err();

        let message = error.to_string();
        assert!(message.contains("follow_up_question"));
        assert!(message.contains("summarize_session"));
        assert!(!message.contains("initial_question"));
        Ok(())
    }

    #[test]
    fn test_render_substitutes_placeholders() -> Result<()> {
        // --- Arrange ---
        let dir = tempdir()?;
        write_required(dir.path())?;
        let prompts = PromptSet::load(dir.path())?;

        // --- Act ---
        let rendered = prompts.render(EVALUATE_ANSWER, &[("topic", "Android")])?;

        // --- Assert ---
        assert_eq!(rendered, "Template evaluate_answer for Android\n");
        assert!(prompts.render("unknown", &[]).is_err());
        Ok(())
    }

    #[test]
    fn test_shipped_prompts_are_complete() -> Result<()> {
        let prompts = PromptSet::load(Path::new(crate::config::DEFAULT_PROMPTS_DIR))?;

        let rendered = prompts.render(
            EVALUATE_ANSWER,
            &[("topic", "Android"), ("answer", "An Activity is a screen")],
        )?;

        assert!(rendered.contains("\"Android\""));
        assert!(rendered.contains("An Activity is a screen"));
        assert!(!rendered.contains("{answer}"));
        Ok(())
    }
}
