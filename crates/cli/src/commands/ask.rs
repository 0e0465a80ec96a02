//! One-shot question against the answering service

use anyhow::Result;
use colored::Colorize;
use logpilot_core::{classifier, ChatSession, EndpointConfig, HttpAnsweringClient, SubmitOutcome};
use serde::Serialize;
use std::sync::Arc;

use crate::output::{describe_highlights, print_json, print_warning, OutputFormat};

#[derive(Serialize)]
struct AskResult<'a> {
    query: &'a str,
    highlights: logpilot_core::HighlightFlags,
    #[serde(flatten)]
    outcome: &'a SubmitOutcome,
}

/// Ask a single question and print the answer
pub async fn ask(endpoints: &EndpointConfig, query: &str, format: OutputFormat) -> Result<()> {
    let query = query.trim();
    if classifier::is_blank(query) {
        print_warning("Nothing to ask");
        return Ok(());
    }

    let session = ChatSession::new(Arc::new(HttpAnsweringClient::new(endpoints)?));
    let highlights = classifier::classify(query);

    if matches!(format, OutputFormat::Table) {
        eprintln!("{}", "Analyzing logs...".dimmed());
    }
    let outcome = session.submit(query).await;

    match format {
        OutputFormat::Json => print_json(&AskResult {
            query,
            highlights,
            outcome: &outcome,
        })?,
        OutputFormat::Table => {
            match &outcome {
                SubmitOutcome::Answered { text, evidence } => {
                    println!("{}", text);
                    if !evidence.is_empty() {
                        println!();
                        println!("{} {}", "Evidence entries:".dimmed(), evidence.len());
                    }
                }
                SubmitOutcome::Failed { kind } => {
                    if let Some(message) = session.messages().last() {
                        println!("{}", message.text.red());
                    }
                    println!("{} {}", "Failure:".dimmed(), kind);
                }
                SubmitOutcome::Ignored | SubmitOutcome::Busy => {}
            }

            println!();
            println!(
                "{} {}",
                "Relevant panels:".bold(),
                describe_highlights(&highlights).cyan()
            );
        }
    }

    Ok(())
}
