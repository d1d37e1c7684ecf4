use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport as ChromiumViewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::seq::SliceRandom;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{GeminiSection, DEFAULT_USER_AGENT};

use super::error::{BrowserError, BrowserResult};

const VIEWPORTS: [[u32; 2]; 4] = [[1366, 768], [1440, 900], [1536, 864], [1920, 1080]];
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportSpec {
    pub width: u32,
    pub height: u32,
}

/// Starts one throwaway Chromium instance per call, each in its own profile
/// directory.
#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    config: Arc<GeminiSection>,
}

impl BrowserLauncher {
    pub fn new(config: Arc<GeminiSection>) -> Self {
        Self { config }
    }

    pub async fn launch(&self, headless: bool) -> BrowserResult<BrowserAutomation> {
        let profile = TempDir::new()?;
        let viewport = self.select_viewport();
        let user_agent = self.select_user_agent();
        let chromium_config =
            self.build_chromium_config(&profile, &viewport, &user_agent, headless)?;
        info!(
            target: "browser",
            ua = %user_agent,
            width = viewport.width,
            height = viewport.height,
            headless,
            "Launching Chromium instance"
        );

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "browser", error = %err, "Chromium handler reported error");
                }
            }
        });

        Ok(BrowserAutomation {
            browser,
            handler_task: Some(handler_task),
            profile: Some(profile),
            user_agent,
        })
    }

    fn select_viewport(&self) -> ViewportSpec {
        let mut rng = rand::thread_rng();
        let [width, height] = VIEWPORTS.choose(&mut rng).copied().unwrap_or([1366, 768]);
        ViewportSpec { width, height }
    }

    fn select_user_agent(&self) -> String {
        let mut rng = rand::thread_rng();
        self.config
            .user_agents
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    pub(crate) fn launch_args(&self, user_agent: &str, viewport: &ViewportSpec) -> Vec<String> {
        vec![
            format!("--user-agent={user_agent}"),
            format!("--window-size={},{}", viewport.width, viewport.height),
            "--disable-blink-features=AutomationControlled".into(),
            "--disable-features=AutomationControlled".into(),
            "--no-first-run".into(),
            "--no-default-browser-check".into(),
            "--disable-background-timer-throttling".into(),
            "--password-store=basic".into(),
        ]
    }

    fn build_chromium_config(
        &self,
        profile: &TempDir,
        viewport: &ViewportSpec,
        user_agent: &str,
        headless: bool,
    ) -> BrowserResult<ChromiumConfig> {
        let mut builder = ChromiumConfig::builder()
            .user_data_dir(profile.path())
            .viewport(ChromiumViewport {
                width: viewport.width,
                height: viewport.height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: viewport.width >= viewport.height,
                has_touch: false,
            });

        if let Some(executable) = &self.config.executable_path {
            builder = builder.chrome_executable(executable);
        }
        if !headless {
            builder = builder.with_head();
        }
        if !self.config.sandbox {
            builder = builder.no_sandbox();
        }
        builder = builder
            .request_timeout(self.config.timeout())
            .args(self.launch_args(user_agent, viewport));

        builder.build().map_err(BrowserError::Configuration)
    }
}

#[derive(Debug)]
pub struct BrowserAutomation {
    browser: Browser,
    handler_task: Option<JoinHandle<()>>,
    profile: Option<TempDir>,
    user_agent: String,
}

impl BrowserAutomation {
    pub async fn new_context(&self, cancel: CancellationToken) -> BrowserResult<BrowserContext> {
        let page = self
            .browser
            .new_page(CreateTargetParams::new("about:blank"))
            .await?;
        page.enable_stealth_mode_with_agent(&self.user_agent).await?;
        let params = SetUserAgentOverrideParams::builder()
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(BrowserError::Configuration)?;
        page.set_user_agent(params).await?;
        Ok(BrowserContext { page, cancel })
    }

    pub async fn shutdown(mut self) -> BrowserResult<()> {
        info!(target: "browser", "Shutting down Chromium instance");
        if let Err(err) = self.browser.close().await {
            warn!(target: "browser", error = %err, "Failed to close browser gracefully");
        }
        if let Some(handle) = self.handler_task.take() {
            if let Err(err) = handle.await {
                warn!(target: "browser", error = %err, "Browser handler join error");
            }
        }
        if let Some(profile) = self.profile.take() {
            profile.close()?;
        }
        Ok(())
    }
}

impl Drop for BrowserAutomation {
    fn drop(&mut self) {
        if let Some(handle) = self.handler_task.take() {
            if !handle.is_finished() {
                warn!(target: "browser", "BrowserAutomation dropped without explicit shutdown");
                handle.abort();
            }
        }
    }
}

/// One page with cancellable waits.
#[derive(Debug)]
pub struct BrowserContext {
    page: Page,
    cancel: CancellationToken,
}

impl BrowserContext {
    pub async fn goto(&self, url: &str) -> BrowserResult<()> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(BrowserError::Configuration)?;
        self.page.goto(params).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    /// Sleeps for `duration` unless the session is cancelled first.
    pub async fn pause(&self, duration: Duration) -> BrowserResult<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(BrowserError::Cancelled),
            _ = sleep(duration) => Ok(()),
        }
    }

    /// Polls until `selector` matches an element with a non-empty box.
    pub async fn wait_visible(&self, selector: &str, max_wait: Duration) -> BrowserResult<()> {
        let script = visibility_script(selector);
        let deadline = Instant::now() + max_wait;
        loop {
            let visible = self
                .page
                .evaluate(script.as_str())
                .await?
                .into_value::<bool>()
                .unwrap_or(false);
            if visible {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(selector.to_string()));
            }
            self.pause(POLL_INTERVAL).await?;
        }
    }

    pub async fn find(&self, selector: &str) -> BrowserResult<Element> {
        self.page
            .find_element(selector)
            .await
            .map_err(|err| BrowserError::ElementNotFound(format!("{selector}: {err}")))
    }

    pub async fn inner_text(&self, selector: &str) -> BrowserResult<String> {
        let element = self.find(selector).await?;
        Ok(element.inner_text().await?.unwrap_or_default())
    }
}

pub(crate) fn visibility_script(selector: &str) -> String {
    let literal = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{ const el = document.querySelector({literal}); \
         if (!el) return false; \
         const style = window.getComputedStyle(el); \
         if (style.visibility === 'hidden' || style.display === 'none') return false; \
         const rect = el.getBoundingClientRect(); \
         return rect.width > 0 && rect.height > 0; }})()"
    )
}
