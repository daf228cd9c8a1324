//! Quiz command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::llm::{Credentials, LlmClient, ProviderRegistry};
use anyhow::{Context, Result};
use std::io::Read;
use std::sync::Arc;

/// Read transcript text from a file path, or stdin for `-`.
fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read transcript from stdin")?;
        Ok(text)
    } else {
        let path = Settings::expand_path(input);
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// Run the quiz command.
pub async fn run_quiz(
    input: &str,
    num_questions: Option<usize>,
    api_key: Option<String>,
    provider: &str,
    json: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Quiz, api_key.as_deref()) {
        Output::error(&format!("{}", e));
        Output::info("Run 'epochly doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let transcript = read_input(input)?;
    let credentials = Credentials::new(api_key.as_deref(), Some(provider))?;
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let registry = ProviderRegistry::from_settings(&settings.llm)?;
    let llm = LlmClient::for_credentials(&registry, &credentials, Arc::new(prompts), settings.llm.clone())?;

    let spinner = Output::spinner("Generating quiz...");

    match llm.generate_quiz(&transcript, num_questions).await {
        Ok(questions) => {
            spinner.finish_and_clear();

            if json {
                println!("{}", serde_json::to_string_pretty(&questions)?);
            } else {
                Output::header(&format!("Quiz ({} questions)", questions.len()));
                for (i, q) in questions.iter().enumerate() {
                    Output::question(i + 1, &q.question, &q.options, &q.correct_answer, &q.explanation);
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate quiz: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
