use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GeminiSection;
use crate::error::AppResult;
use crate::llm::{ProviderKind, TextProvider};

use super::automation::{BrowserAutomation, BrowserContext, BrowserLauncher};
use super::error::{BrowserError, BrowserResult};

const PAGE_READY_DELAY: Duration = Duration::from_secs(2);
const TYPING_SETTLE: Duration = Duration::from_millis(500);
const CONNECTION_PROBE: &str = "Say 'OK' if you can read this.";

/// Fallback text generator that drives the Gemini web chat.
///
/// Each call launches a fresh browser and tears it down afterwards. Calls are
/// serialized: at most one automated session runs at a time. A failed session
/// is not retried here.
#[derive(Debug)]
pub struct GeminiClient {
    launcher: BrowserLauncher,
    config: Arc<GeminiSection>,
    headless: bool,
    cancel: CancellationToken,
    session: Mutex<()>,
}

impl GeminiClient {
    pub fn new(config: GeminiSection, cancel: CancellationToken) -> Self {
        let headless = config.headless;
        let config = Arc::new(config);
        Self {
            launcher: BrowserLauncher::new(Arc::clone(&config)),
            config,
            headless,
            cancel,
            session: Mutex::new(()),
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub async fn generate_text(&self, prompt: &str) -> AppResult<String> {
        let _session = self.session.lock().await;
        let deadline = self.config.timeout();
        match timeout(deadline, self.run_session(prompt)).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(BrowserError::Timeout(format!(
                "gemini response after {}s",
                deadline.as_secs()
            ))
            .into()),
        }
    }

    pub async fn test_connection(&self) -> AppResult<()> {
        self.generate_text(CONNECTION_PROBE).await.map(|_| ())
    }

    async fn run_session(&self, prompt: &str) -> BrowserResult<String> {
        let automation = self.launcher.launch(self.headless).await?;
        let result = self.converse(&automation, prompt).await;
        if let Err(err) = automation.shutdown().await {
            warn!(target: "browser", error = %err, "browser shutdown failed");
        }
        result
    }

    async fn converse(
        &self,
        automation: &BrowserAutomation,
        prompt: &str,
    ) -> BrowserResult<String> {
        let context = automation.new_context(self.cancel.clone()).await?;
        let max_wait = self.config.timeout();
        let prompt_selector = self.config.prompt_selector.as_str();
        let response_selector = self.config.response_selector.as_str();

        context.goto(&self.config.url).await?;
        context.wait_visible(prompt_selector, max_wait).await?;
        context.pause(PAGE_READY_DELAY).await?;

        submit_prompt(&context, prompt_selector, prompt).await?;
        info!(target: "browser", chars = prompt.len(), "prompt submitted to gemini");

        context.pause(self.config.settle()).await?;
        context.wait_visible(response_selector, max_wait).await?;

        let text = context.inner_text(response_selector).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(BrowserError::EmptyResponse("gemini".into()));
        }
        Ok(text.to_string())
    }
}

async fn submit_prompt(
    context: &BrowserContext,
    selector: &str,
    prompt: &str,
) -> BrowserResult<()> {
    let input = context.find(selector).await?;
    input.click().await?;
    input.type_str(prompt).await?;
    context.pause(TYPING_SETTLE).await?;
    input.press_key("Enter").await?;
    Ok(())
}

#[async_trait]
impl TextProvider for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Automation
    }

    async fn generate(&self, prompt: &str, _temperature: f32) -> AppResult<String> {
        self.generate_text(prompt).await
    }
}
