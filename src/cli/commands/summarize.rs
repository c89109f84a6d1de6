//! Summarize command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::fetch::validate_url;
use crate::summarize::SummarizePipeline;
use anyhow::Result;
use std::io::Write;

/// Run the summarize command.
pub async fn run_summarize(
    url: &str,
    model: Option<String>,
    no_stream: bool,
    api_key: Option<&str>,
    settings: Settings,
) -> Result<()> {
    // Reject bad input before asking for credentials.
    if let Err(e) = validate_url(url) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let api_key = match preflight::require_api_key(&settings, api_key) {
        Ok(key) => key,
        Err(e) => {
            Output::error(&e.to_string());
            return Err(e.into());
        }
    };

    let prompts = Prompts::from_settings(&settings)?;
    let pipeline = SummarizePipeline::from_settings(&settings, prompts, &api_key, model.as_deref())?;

    let result = if no_stream {
        let spinner = Output::spinner("Fetching and summarizing...");
        let result = pipeline.run(url, None).await;
        spinner.finish_and_clear();
        result.map(|summary| println!("\n{}\n", summary.text))
    } else {
        Output::info(&format!("Summarizing {}", url.trim()));
        println!();
        let mut print_token = |token: &str| {
            print!("{}", token);
            std::io::stdout().flush().ok();
        };
        let result = pipeline.run(url, Some(&mut print_token)).await;
        println!("\n");
        result.map(|_| ())
    };

    match result {
        Ok(()) => {
            Output::success("Done.");
            Ok(())
        }
        Err(e) => {
            Output::error(&e.to_string());
            Err(e.into())
        }
    }
}
