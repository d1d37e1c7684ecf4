use std::time::Instant;

use clap::{Args, Subcommand};
use gagipress_core::{ProviderKind, Spinner};
use serde::Serialize;
use tracing::info;

use crate::{AppContext, DisplayFallback, Result};

#[derive(Subcommand, Debug)]
pub enum TestCommands {
    /// Send a short probe to the OpenAI API
    Openai,
    /// Send a prompt through the Gemini web chat
    Gemini(TestGeminiArgs),
}

#[derive(Args, Debug)]
pub struct TestGeminiArgs {
    /// Prompt to send
    pub prompt: String,
    /// Override the configured headless mode (true|false)
    #[arg(long)]
    pub headless: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub response: Option<String>,
    pub elapsed_ms: u128,
}

pub(crate) async fn test_openai(context: &AppContext) -> Result<ConnectionReport> {
    let client = context.openai()?;
    let started = Instant::now();
    let spinner = Spinner::start("Testing OpenAI connection");
    let result = client.test_connection().await;
    spinner.finish().await;
    result?;
    info!(model = client.model(), "openai connection ok");
    Ok(ConnectionReport {
        provider: ProviderKind::Network,
        model: Some(client.model().to_string()),
        response: None,
        elapsed_ms: started.elapsed().as_millis(),
    })
}

pub(crate) async fn test_gemini(
    context: &AppContext,
    args: &TestGeminiArgs,
) -> Result<ConnectionReport> {
    let client = context.gemini(args.headless);
    let started = Instant::now();
    let spinner = Spinner::start("Waiting for Gemini");
    let result = client.generate_text(&args.prompt).await;
    spinner.finish().await;
    Ok(ConnectionReport {
        provider: ProviderKind::Automation,
        model: None,
        response: Some(result?),
        elapsed_ms: started.elapsed().as_millis(),
    })
}

impl DisplayFallback for ConnectionReport {
    fn display(&self) -> String {
        let mut lines = vec![format!(
            "{} connection OK ({} ms)",
            self.provider, self.elapsed_ms
        )];
        if let Some(model) = &self.model {
            lines.push(format!("Model: {model}"));
        }
        if let Some(response) = &self.response {
            lines.push(format!("Response:\n{response}"));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_model_and_response() {
        let report = ConnectionReport {
            provider: ProviderKind::Network,
            model: Some("gpt-4o-mini".into()),
            response: None,
            elapsed_ms: 42,
        };
        assert_eq!(report.display(), "openai connection OK (42 ms)\nModel: gpt-4o-mini");

        let report = ConnectionReport {
            provider: ProviderKind::Automation,
            model: None,
            response: Some("OK".into()),
            elapsed_ms: 1500,
        };
        assert!(report.display().ends_with("Response:\nOK"));
    }
}
