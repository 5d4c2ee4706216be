use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for admin-curated prompt templates
#[derive(Debug, Clone, FromRow)]
pub struct Prompt {
    pub id: i64,
    pub title: String,
    /// Main prompt text sent to the generation provider
    pub prompt_text: Option<String>,
    /// Style suffix appended after the main text
    pub style_text: Option<String>,
    /// Inactive prompts are rejected before any generation cost is incurred
    pub active: bool,
    pub example_image_filename: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Prompt {
    /// Assemble the provider-facing prompt from the template parts.
    pub fn generation_prompt(&self) -> String {
        let parts: Vec<&str> = [self.prompt_text.as_deref(), self.style_text.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect();

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(text: Option<&str>, style: Option<&str>) -> Prompt {
        Prompt {
            id: 1,
            title: "Retro poster".to_string(),
            prompt_text: text.map(String::from),
            style_text: style.map(String::from),
            active: true,
            example_image_filename: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_generation_prompt_joins_parts() {
        let p = prompt(Some("Turn the photo into a poster"), Some("bold colors"));
        assert_eq!(
            p.generation_prompt(),
            "Turn the photo into a poster bold colors"
        );
    }

    #[test]
    fn test_generation_prompt_skips_empty_parts() {
        assert_eq!(prompt(Some("Poster"), None).generation_prompt(), "Poster");
        assert_eq!(prompt(None, Some(" ")).generation_prompt(), "");
    }
}
