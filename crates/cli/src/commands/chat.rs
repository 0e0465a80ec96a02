//! Interactive chat with a live dashboard in the background

use anyhow::Result;
use colored::Colorize;
use logpilot_core::{
    ChatSession, DashboardController, DashboardControllerBuilder, EndpointConfig,
    HttpAnsweringClient, HttpStatsClient, SubmitOutcome,
};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::output::{describe_highlights, print_dashboard, print_info, OutputFormat};

/// REPL commands besides plain questions
enum Input<'a> {
    Question(&'a str),
    Dashboard,
    Quit,
    Blank,
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Blank,
        "/quit" | "/exit" => Input::Quit,
        "/dashboard" => Input::Dashboard,
        question => Input::Question(question),
    }
}

/// Run `work` to completion unless `interrupt` resolves first
async fn until_interrupted<T, I>(work: impl Future<Output = T>, interrupt: I) -> Option<T>
where
    I: Future,
{
    tokio::select! {
        biased;
        output = work => Some(output),
        _ = interrupt => None,
    }
}

/// Run the chat loop over stdin until EOF, `/quit` or Ctrl-C
pub async fn run(endpoints: &EndpointConfig, poll_interval: Duration) -> Result<()> {
    let dashboard = Arc::new(
        DashboardControllerBuilder::new()
            .source(Arc::new(HttpStatsClient::new(endpoints)?))
            .poll_interval(poll_interval)
            .build()?,
    );
    dashboard.start();

    let session = ChatSession::new(Arc::new(HttpAnsweringClient::new(endpoints)?))
        .with_listener(dashboard.clone());

    print_info("Ask about your logs. /dashboard shows the panels, /quit exits.");

    let result = repl(&session, &dashboard).await;
    dashboard.teardown();
    result
}

async fn repl(session: &ChatSession, dashboard: &DashboardController) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", ">".cyan().bold());
        std::io::stdout().flush()?;

        let line = until_interrupted(lines.next_line(), tokio::signal::ctrl_c()).await;
        let Some(line) = line.transpose()?.flatten() else {
            println!();
            return Ok(());
        };

        let question = match parse_input(&line) {
            Input::Blank => continue,
            Input::Quit => return Ok(()),
            Input::Dashboard => {
                print_dashboard(&dashboard.view(), OutputFormat::Table)?;
                continue;
            }
            Input::Question(question) => question,
        };

        println!("{}", "Analyzing logs...".dimmed());
        let Some(outcome) =
            until_interrupted(session.submit(question), tokio::signal::ctrl_c()).await
        else {
            println!();
            return Ok(());
        };

        match outcome {
            SubmitOutcome::Answered { text, evidence } => {
                println!("{}", text);
                if !evidence.is_empty() {
                    println!("{} {}", "Evidence entries:".dimmed(), evidence.len());
                }
            }
            SubmitOutcome::Failed { .. } => {
                if let Some(message) = session.messages().last() {
                    println!("{}", message.text.red());
                }
            }
            SubmitOutcome::Ignored | SubmitOutcome::Busy => continue,
        }

        println!(
            "{} {}",
            "Relevant panels:".bold(),
            describe_highlights(&dashboard.highlights()).cyan()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use logpilot_core::chat::SERVICE_FAILURE_MESSAGE;
    use logpilot_core::{AnsweringService, ChatMessage, FetchError, QueryAnswer};

    /// Service that never answers
    struct SilentService;

    #[async_trait]
    impl AnsweringService for SilentService {
        async fn answer(&self, _query: &str) -> Result<QueryAnswer, FetchError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_interrupt_abandons_pending_answer() {
        let session = ChatSession::new(Arc::new(SilentService));

        let outcome = until_interrupted(session.submit("slow question"), async {}).await;

        assert!(outcome.is_none());
        assert!(!session.is_busy());
        assert_eq!(
            session.messages(),
            vec![
                ChatMessage::user("slow question"),
                ChatMessage::assistant(SERVICE_FAILURE_MESSAGE),
            ]
        );
    }

    #[tokio::test]
    async fn test_completed_work_wins_over_pending_interrupt() {
        let output = until_interrupted(async { 7 }, std::future::pending::<()>()).await;
        assert_eq!(output, Some(7));
    }

    #[test]
    fn test_parse_input() {
        assert!(matches!(parse_input("   "), Input::Blank));
        assert!(matches!(parse_input("/quit"), Input::Quit));
        assert!(matches!(parse_input(" /exit "), Input::Quit));
        assert!(matches!(parse_input("/dashboard"), Input::Dashboard));
        assert!(matches!(
            parse_input("  why are pods timing out "),
            Input::Question("why are pods timing out")
        ));
    }
}
