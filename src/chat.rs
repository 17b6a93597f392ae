//! Interactive chat session: one free-text question per line.

use crate::report;
use crate::service::CricketService;
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const PROMPT: &str = "🏏 crickstat > ";

const HELP: &str = "\
Ask anything about cricket players, one question per line.

Examples:
  analyze Virat Kohli in tests
  compare Sachin Tendulkar vs Brian Lara in ODI
  Who has the highest Test average?

Commands:
  help           Show this message
  quit/exit/q    Leave the session

Formats: Test, ODI, T20I, all (default: all)
";

/// Run the session until quit, end of input, or cancellation.
///
/// A failed question is reported and the session carries on.
pub async fn run_session<R, W>(
    service: &CricketService,
    reader: R,
    mut writer: W,
    cancel: &CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(b"\nCrickstat chat. Type 'help' for examples, 'quit' to leave.\n\n")
        .await?;

    let mut lines = reader.lines();
    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        let input = line.trim();
        match input.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "help" => {
                writer.write_all(HELP.as_bytes()).await?;
                continue;
            }
            _ => {}
        }

        debug!("Chat question: {}", input);
        let reply = match service.ask(input, cancel).await {
            Ok(answer) => format!("\n{}\n", report::generate_markdown_answer(&answer)),
            Err(e) => format!("❌ Error: {}\n\n", e),
        };
        writer.write_all(reply.as_bytes()).await?;
    }

    writer.write_all(b"\nGoodbye!\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::{standard_sources, test_service};
    use crate::testing::FakeBackend;
    use std::sync::Arc;

    async fn chat(service: &CricketService, input: &str) -> String {
        let mut output = Vec::new();
        run_session(service, input.as_bytes(), &mut output, &CancellationToken::new())
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_session_answers_until_quit() {
        let backend = Arc::new(FakeBackend::replying("Bradman leads the list."));
        let service = test_service(Some(Arc::clone(&backend)), standard_sources());

        let input = "help\n\n   \nWho has the highest Test average?\nQUIT\nanalyze Virat Kohli\n";
        let output = chat(&service, input).await;

        assert!(output.contains("quit/exit/q"));
        assert!(output.contains("Bradman leads the list."));
        assert!(output.ends_with("Goodbye!\n"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_session_survives_failed_question() {
        let backend = Arc::new(FakeBackend::replying("Solid numbers."));
        let service = test_service(Some(Arc::clone(&backend)), standard_sources());

        let output = chat(&service, "show me test batting stats\nanalyze Virat Kohli in tests\n").await;

        assert!(output.contains("❌ Error:"));
        assert!(output.contains("Solid numbers."));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_session_stops_when_cancelled() {
        let backend = Arc::new(FakeBackend::replying("unused"));
        let service = test_service(Some(Arc::clone(&backend)), standard_sources());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut output = Vec::new();
        run_session(&service, "analyze Virat Kohli\n".as_bytes(), &mut output, &cancel)
            .await
            .unwrap();

        assert_eq!(backend.calls(), 0);
    }
}
