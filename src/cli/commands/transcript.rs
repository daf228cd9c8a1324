//! Transcript command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{preview, Output};
use crate::config::{Prompts, Settings};
use crate::error::EpochlyError;
use crate::llm::{Credentials, LlmClient, ProviderRegistry};
use crate::orchestrator::FallbackChain;
use crate::transcript::{TranscriptCache, TranscriptRequest};
use anyhow::Result;
use std::sync::Arc;

/// Run the transcript command.
pub async fn run_transcript(
    url: &str,
    instructions: Option<String>,
    api_key: Option<String>,
    provider: &str,
    settings: Settings,
) -> Result<()> {
    let request = TranscriptRequest::from_url(url, instructions)?;

    // Resolve the provider up front so a bad key or name fails before any fetch.
    let llm = match &request.instructions {
        Some(_) => {
            if let Err(e) = preflight::check(Operation::Summarize, api_key.as_deref()) {
                Output::error(&e.to_string());
                Output::info("Run 'epochly doctor' for detailed diagnostics.");
                return Err(e.into());
            }
            let credentials = Credentials::new(api_key.as_deref(), Some(provider))?;
            let prompts = Prompts::load(
                settings.prompts.custom_dir.as_deref(),
                Some(&settings.prompts.variables),
            )?;
            let registry = ProviderRegistry::from_settings(&settings.llm)?;
            Some(LlmClient::for_credentials(
                &registry,
                &credentials,
                Arc::new(prompts),
                settings.llm.clone(),
            )?)
        }
        None => None,
    };

    let cache = Arc::new(TranscriptCache::from_settings(&settings.cache)?);
    let chain = FallbackChain::from_settings(&settings, cache)?;

    let spinner = Output::spinner(&format!("Fetching transcript for {}...", request.video_id));
    let fetched = chain.fetch(&request.video_id).await;
    spinner.finish_and_clear();

    let result = match fetched {
        Ok(result) => result,
        Err(EpochlyError::TranscriptUnavailable(failures)) => {
            Output::error(&format!("No transcript available for {}", request.video_id));
            for failure in &failures {
                Output::list_item(&failure.to_string());
            }
            return Err(EpochlyError::TranscriptUnavailable(failures).into());
        }
        Err(e) => return Err(e.into()),
    };

    Output::success(&format!(
        "Transcript from {} ({} chars): {}",
        result.source,
        result.text.len(),
        preview(&result.text, 60)
    ));
    if let Some(lang) = &result.language {
        Output::kv("Language", lang);
    }
    println!("\n{}", result.text);

    if let (Some(llm), Some(instructions)) = (llm, request.instructions.as_deref()) {
        let spinner = Output::spinner(&format!("Summarizing with {}...", llm.provider_name()));
        let summary = llm.summarize(&result.text, Some(instructions)).await;
        spinner.finish_and_clear();

        let summary = summary?;
        Output::header("Summary");
        println!("{}", summary.text);
    }

    Ok(())
}
