//! Prompt templates for Epochly.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    pub quiz: QuizPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for transcript summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub system: String,
    pub user: String,
    /// Instructions used when the caller supplies none.
    pub default_instructions: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            system: "You are an educational assistant that specializes in creating concise, informative summaries.".to_string(),

            user: r#"You are an expert in creating concise, informative summaries of video content.

INSTRUCTIONS:
{{instructions}}

VIDEO TRANSCRIPT:
{{transcript}}

Provide only the summary without any introductory text like "Here's a summary:" or "Summary:"."#.to_string(),

            default_instructions: r#"Create a concise, informative summary of the video transcript.
Focus on key points, main ideas, and important takeaways.
Keep the summary well-structured with headers for main sections."#.to_string(),
        }
    }
}

/// Prompts for multiple-choice quiz generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizPrompts {
    pub system: String,
    pub user: String,
}

impl Default for QuizPrompts {
    fn default() -> Self {
        Self {
            system: "You are an educational assistant that creates high-quality assessment questions.".to_string(),

            user: r#"You are an expert in creating educational assessments.

INSTRUCTIONS:
Create exactly {{num_questions}} multiple-choice questions based on the provided transcript.
Each question must:
1. Test understanding of key concepts from the content
2. Have exactly 4 distinct options
3. Have exactly one correct answer
4. Include a brief explanation of why the correct answer is right

The "correctAnswer" value must be copied verbatim from one of the strings in "options".
Do not use letters such as "A" or "B" in place of the option text.

FORMAT YOUR RESPONSE AS A JSON ARRAY with the following structure for each question:
{
    "question": "The question text",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correctAnswer": "The correct option text",
    "explanation": "Brief explanation of the correct answer"
}

TRANSCRIPT:
{{transcript}}

Provide ONLY the JSON array without any additional text. Ensure the JSON is valid."#.to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }

            let quiz_path = custom_path.join("quiz.toml");
            if quiz_path.exists() {
                let content = std::fs::read_to_string(&quiz_path)?;
                prompts.quiz = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is single-pass, so `{{...}}` sequences inside values
    /// (a transcript quoting a template, say) are left untouched.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = &after[..end];
                    match vars.get(key.trim()) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
