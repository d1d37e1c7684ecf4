//! Generation orchestrator: provider selection, payload extraction and
//! persistence of ideas and scripts.

mod extract;
mod ideas;
mod scripts;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, AppResult, ErrorKind};
use crate::llm::{ProviderKind, TextProvider};

pub use extract::{extract_array, extract_object};
pub use ideas::{parse_ideas, GeneratedIdea, IdeaBatchReport, IdeaGenerator};
pub use scripts::{
    parse_script, GeneratedScript, ScriptGenerator, ScriptReport, DEFAULT_HASHTAGS,
    DEFAULT_SCRIPT_LENGTH,
};

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPreference {
    /// Network client first, automation client on failure.
    #[default]
    NetworkFirst,
    /// Skip the network client entirely.
    AutomationOnly,
}

impl ProviderPreference {
    pub fn from_automation_flag(prefer_automation: bool) -> Self {
        if prefer_automation {
            ProviderPreference::AutomationOnly
        } else {
            ProviderPreference::NetworkFirst
        }
    }
}

/// Provider in use for one generation item.
///
/// `Network -> Automation` is the only transition, taken at most once per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSelection {
    Network,
    Automation,
}

impl ProviderSelection {
    pub fn initial(preference: ProviderPreference) -> Self {
        match preference {
            ProviderPreference::NetworkFirst => ProviderSelection::Network,
            ProviderPreference::AutomationOnly => ProviderSelection::Automation,
        }
    }

    pub fn fallback(self) -> Option<Self> {
        match self {
            ProviderSelection::Network => Some(ProviderSelection::Automation),
            ProviderSelection::Automation => None,
        }
    }
}

/// Raw provider output together with the provider that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub provider: ProviderKind,
}

/// The network and automation clients, tried in selection order.
#[derive(Clone)]
pub struct Providers {
    network: Arc<dyn TextProvider>,
    automation: Arc<dyn TextProvider>,
}

impl Providers {
    pub fn new(network: Arc<dyn TextProvider>, automation: Arc<dyn TextProvider>) -> Self {
        Self {
            network,
            automation,
        }
    }

    fn provider(&self, selection: ProviderSelection) -> &dyn TextProvider {
        match selection {
            ProviderSelection::Network => self.network.as_ref(),
            ProviderSelection::Automation => self.automation.as_ref(),
        }
    }

    /// Runs the prompt through the selected provider, falling back once.
    ///
    /// Cancellation is returned as is and never triggers the fallback.
    pub async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        preference: ProviderPreference,
    ) -> AppResult<Generation> {
        let mut selection = ProviderSelection::initial(preference);
        let mut earlier: Option<(ProviderKind, AppError)> = None;
        loop {
            let provider = self.provider(selection);
            let kind = provider.kind();
            info!(target: "generator", provider = %kind, "requesting generation");
            match provider.generate(prompt, temperature).await {
                Ok(text) => {
                    return Ok(Generation {
                        text,
                        provider: kind,
                    })
                }
                Err(err) if err.is_kind(ErrorKind::Cancelled) => return Err(err),
                Err(err) => match selection.fallback() {
                    Some(next) => {
                        warn!(
                            target: "generator",
                            provider = %kind,
                            next = %self.provider(next).kind(),
                            error = %err,
                            "provider failed, falling back"
                        );
                        earlier = Some((kind, err));
                        selection = next;
                    }
                    None => return Err(exhausted(kind, err, earlier)),
                },
            }
        }
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("network", &self.network.kind())
            .field("automation", &self.automation.kind())
            .finish()
    }
}

fn exhausted(
    last: ProviderKind,
    err: AppError,
    earlier: Option<(ProviderKind, AppError)>,
) -> AppError {
    let kind = err.kind();
    let message = match earlier {
        Some((first, first_err)) => format!("{first} failed ({first_err}), then {last} failed"),
        None => format!("{last} failed"),
    };
    AppError::wrap(err, kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        kind: ProviderKind,
        reply: Option<String>,
        error: ErrorKind,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(kind: ProviderKind, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply: Some(reply.to_string()),
                error: ErrorKind::Api,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(kind: ProviderKind, error: ErrorKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply: None,
                error,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextProvider for Scripted {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn generate(&self, _prompt: &str, _temperature: f32) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| AppError::new(self.error, format!("{} down", self.kind)))
        }
    }

    #[test]
    fn selection_falls_back_exactly_once() {
        let first = ProviderSelection::initial(ProviderPreference::NetworkFirst);
        assert_eq!(first, ProviderSelection::Network);
        assert_eq!(first.fallback(), Some(ProviderSelection::Automation));
        assert_eq!(ProviderSelection::Automation.fallback(), None);
        assert_eq!(
            ProviderSelection::initial(ProviderPreference::from_automation_flag(true)),
            ProviderSelection::Automation
        );
    }

    #[tokio::test]
    async fn network_success_skips_automation() {
        let network = Scripted::ok(ProviderKind::Network, "net");
        let automation = Scripted::ok(ProviderKind::Automation, "auto");
        let providers = Providers::new(network.clone(), automation.clone());
        let generation = providers
            .generate("p", 0.8, ProviderPreference::NetworkFirst)
            .await
            .unwrap();
        assert_eq!(generation.provider, ProviderKind::Network);
        assert_eq!(automation.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn network_failure_falls_back_to_automation() {
        let network = Scripted::failing(ProviderKind::Network, ErrorKind::Api);
        let automation = Scripted::ok(ProviderKind::Automation, "auto");
        let providers = Providers::new(network.clone(), automation.clone());
        let generation = providers
            .generate("p", 0.8, ProviderPreference::NetworkFirst)
            .await
            .unwrap();
        assert_eq!(generation.text, "auto");
        assert_eq!(generation.provider, ProviderKind::Automation);
        assert_eq!(network.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_failures_name_both_providers() {
        let network = Scripted::failing(ProviderKind::Network, ErrorKind::Network);
        let automation = Scripted::failing(ProviderKind::Automation, ErrorKind::Api);
        let providers = Providers::new(network, automation.clone());
        let err = providers
            .generate("p", 0.8, ProviderPreference::NetworkFirst)
            .await
            .unwrap_err();
        assert!(err.is_kind(ErrorKind::Api));
        assert!(err
            .message()
            .starts_with("openai failed (network: openai down), then gemini failed"));
        assert_eq!(automation.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn automation_only_never_touches_network() {
        let network = Scripted::ok(ProviderKind::Network, "net");
        let automation = Scripted::failing(ProviderKind::Automation, ErrorKind::Api);
        let providers = Providers::new(network.clone(), automation);
        let err = providers
            .generate("p", 0.8, ProviderPreference::AutomationOnly)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "gemini failed");
        assert_eq!(network.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_does_not_fall_back() {
        let network = Scripted::failing(ProviderKind::Network, ErrorKind::Cancelled);
        let automation = Scripted::ok(ProviderKind::Automation, "auto");
        let providers = Providers::new(network, automation.clone());
        let err = providers
            .generate("p", 0.8, ProviderPreference::NetworkFirst)
            .await
            .unwrap_err();
        assert!(err.is_kind(ErrorKind::Cancelled));
        assert_eq!(automation.calls.load(Ordering::SeqCst), 0);
    }
}
