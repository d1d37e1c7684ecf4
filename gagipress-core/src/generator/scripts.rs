use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AmazonSection;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::llm::ProviderKind;
use crate::models::{Book, ContentIdea, ContentScript, ContentScriptInput, IdeaStatus, Platform};
use crate::prompts::{script_prompt, SCRIPT_TEMPERATURE};
use crate::store::ContentStore;

use super::extract::extract_object;
use super::{ProviderPreference, Providers};

pub const DEFAULT_SCRIPT_LENGTH: u32 = 45;
pub const DEFAULT_HASHTAGS: [&str; 2] = ["#booktok", "#bookstagram"];
const DEFAULT_BOOK_TITLE: &str = "Your Book";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedScript {
    #[serde(default)]
    pub hook: String,
    #[serde(default)]
    pub main_content: String,
    #[serde(default)]
    pub cta: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub music_suggestion: String,
    #[serde(default)]
    pub video_notes: String,
    #[serde(default)]
    pub estimated_length: u32,
}

impl GeneratedScript {
    pub fn to_input(&self, idea_id: &str) -> ContentScriptInput {
        ContentScriptInput {
            idea_id: idea_id.to_string(),
            hook: self.hook.clone(),
            full_script: self.main_content.clone(),
            cta: self.cta.clone(),
            hashtags: self.hashtags.clone(),
            music_suggestion: non_empty(&self.music_suggestion),
            video_notes: non_empty(&self.video_notes),
            estimated_duration: self.estimated_length,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Locates the JSON object in `raw`, decodes it, checks mandatory fields and
/// fills in defaults for length and hashtags.
pub fn parse_script(raw: &str) -> AppResult<GeneratedScript> {
    let payload = extract_object(raw)?;
    let mut script: GeneratedScript = serde_json::from_str(payload).map_err(|err| {
        AppError::wrap(err, ErrorKind::Validation, "failed to parse generated script")
    })?;

    let required = [
        ("hook", &script.hook),
        ("main_content", &script.main_content),
        ("cta", &script.cta),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::validation(format!("missing required field: {field}")));
        }
    }

    if script.estimated_length == 0 {
        script.estimated_length = DEFAULT_SCRIPT_LENGTH;
    }
    if script.hashtags.is_empty() {
        script.hashtags = DEFAULT_HASHTAGS.iter().map(|tag| tag.to_string()).collect();
    }
    Ok(script)
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptReport {
    pub script: ContentScript,
    pub generated: GeneratedScript,
    pub provider: ProviderKind,
    /// False when the idea could not be marked as scripted.
    pub status_updated: bool,
}

#[derive(Clone)]
pub struct ScriptGenerator {
    providers: Providers,
    store: Arc<dyn ContentStore>,
    amazon: AmazonSection,
}

impl ScriptGenerator {
    pub fn new(providers: Providers, store: Arc<dyn ContentStore>, amazon: AmazonSection) -> Self {
        Self {
            providers,
            store,
            amazon,
        }
    }

    pub async fn run(
        &self,
        idea: &ContentIdea,
        book: Option<&Book>,
        platform: Platform,
        preference: ProviderPreference,
    ) -> AppResult<ScriptReport> {
        if idea.status != IdeaStatus::Approved {
            return Err(AppError::validation(format!(
                "idea must be approved first (current status: {})",
                idea.status
            )));
        }

        let (generated, provider) = self.generate(idea, book, platform, preference).await?;
        let script = self.store.create_script(&generated.to_input(&idea.id)).await?;
        info!(
            target: "generator",
            idea_id = %idea.id,
            script_id = %script.id,
            provider = %provider,
            "script stored"
        );

        let status_updated = match self
            .store
            .update_idea_status(&idea.id, IdeaStatus::Scripted)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    target: "generator",
                    idea_id = %idea.id,
                    error = %err,
                    "failed to mark idea as scripted"
                );
                false
            }
        };

        Ok(ScriptReport {
            script,
            generated,
            provider,
            status_updated,
        })
    }

    pub async fn generate(
        &self,
        idea: &ContentIdea,
        book: Option<&Book>,
        platform: Platform,
        preference: ProviderPreference,
    ) -> AppResult<(GeneratedScript, ProviderKind)> {
        let title = book.map(|book| book.title.as_str()).unwrap_or(DEFAULT_BOOK_TITLE);
        let amazon_url = self
            .amazon
            .product_url(book.and_then(|book| book.kdp_asin.as_deref()));
        let prompt = script_prompt(&idea.brief_description, title, platform, &amazon_url);

        let generation = self
            .providers
            .generate(&prompt, SCRIPT_TEMPERATURE, preference)
            .await?;
        let script = parse_script(&generation.text).map_err(|err| {
            let message = format!("{} returned an unusable script payload", generation.provider);
            AppError::wrap(err, ErrorKind::Validation, message)
        })?;
        Ok((script, generation.provider))
    }
}

impl std::fmt::Debug for ScriptGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptGenerator")
            .field("providers", &self.providers)
            .field("amazon", &self.amazon)
            .finish_non_exhaustive()
    }
}
