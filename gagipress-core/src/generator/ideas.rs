use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, AppResult, ErrorKind};
use crate::llm::ProviderKind;
use crate::models::{Book, ContentIdea, ContentIdeaInput, IdeaType};
use crate::prompts::{idea_prompt, BookNiche, IDEA_TEMPERATURE};
use crate::store::ContentStore;

use super::extract::extract_array;
use super::{ProviderPreference, Providers};

/// One idea as returned by a provider, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedIdea {
    #[serde(rename = "type", default)]
    pub idea_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hook: String,
    #[serde(default)]
    pub cta: String,
    #[serde(default)]
    pub relevance_score: i64,
}

impl GeneratedIdea {
    pub fn brief_description(&self) -> String {
        let title = self.title.trim();
        let description = self.description.trim();
        match (title.is_empty(), description.is_empty()) {
            (false, false) => format!("{title}: {description}"),
            (false, true) => title.to_string(),
            (true, false) => description.to_string(),
            (true, true) => String::new(),
        }
    }

    pub fn to_input(&self, book_id: Option<&str>) -> AppResult<ContentIdeaInput> {
        let idea_type: IdeaType = self.idea_type.parse()?;
        let relevance_score = u8::try_from(self.relevance_score)
            .ok()
            .filter(|score| *score <= 100)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "relevance score {} outside 0-100",
                    self.relevance_score
                ))
            })?;
        let input = ContentIdeaInput {
            idea_type,
            brief_description: self.brief_description(),
            relevance_score: Some(relevance_score),
            book_id: book_id.map(str::to_string),
            metadata: Some(serde_json::json!({
                "hook": self.hook,
                "cta": self.cta,
            })),
        };
        input.validate()?;
        Ok(input)
    }
}

/// Locates the JSON array in `raw` and decodes it.
pub fn parse_ideas(raw: &str) -> AppResult<Vec<GeneratedIdea>> {
    let payload = extract_array(raw)?;
    serde_json::from_str(payload).map_err(|err| {
        AppError::wrap(err, ErrorKind::Validation, "failed to parse generated ideas")
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct IdeaBatchReport {
    pub book_id: Option<String>,
    pub provider: ProviderKind,
    pub generated: usize,
    pub saved: Vec<ContentIdea>,
    pub skipped: usize,
}

impl IdeaBatchReport {
    pub fn saved_count(&self) -> usize {
        self.saved.len()
    }
}

#[derive(Clone)]
pub struct IdeaGenerator {
    providers: Providers,
    store: Arc<dyn ContentStore>,
}

impl IdeaGenerator {
    pub fn new(providers: Providers, store: Arc<dyn ContentStore>) -> Self {
        Self { providers, store }
    }

    /// Generates `count` ideas for `book` and stores every one that validates.
    ///
    /// Fails only when no provider produced a parseable payload; individual
    /// records that fail validation or storage are skipped.
    pub async fn run(
        &self,
        book: &Book,
        count: usize,
        preference: ProviderPreference,
    ) -> AppResult<IdeaBatchReport> {
        let (ideas, provider) = self.generate(book, count, preference).await?;
        let generated = ideas.len();
        info!(
            target: "generator",
            book_id = %book.id,
            provider = %provider,
            generated,
            "ideas generated"
        );

        let (saved, skipped) = self.save(&ideas, Some(&book.id)).await;
        Ok(IdeaBatchReport {
            book_id: Some(book.id.clone()),
            provider,
            generated,
            saved,
            skipped,
        })
    }

    pub async fn generate(
        &self,
        book: &Book,
        count: usize,
        preference: ProviderPreference,
    ) -> AppResult<(Vec<GeneratedIdea>, ProviderKind)> {
        let niche = BookNiche::from_genre(&book.genre);
        let prompt = idea_prompt(book, niche, count);
        let generation = self
            .providers
            .generate(&prompt, IDEA_TEMPERATURE, preference)
            .await?;
        let ideas = parse_ideas(&generation.text).map_err(|err| {
            let message = format!("{} returned an unusable idea payload", generation.provider);
            AppError::wrap(err, ErrorKind::Validation, message)
        })?;
        Ok((ideas, generation.provider))
    }

    /// Saves ideas one at a time; returns the stored rows and the skip count.
    pub async fn save(
        &self,
        ideas: &[GeneratedIdea],
        book_id: Option<&str>,
    ) -> (Vec<ContentIdea>, usize) {
        let mut saved = Vec::with_capacity(ideas.len());
        let mut skipped = 0;
        for (index, idea) in ideas.iter().enumerate() {
            let stored = match idea.to_input(book_id) {
                Ok(input) => self.store.create_idea(&input).await,
                Err(err) => Err(err),
            };
            match stored {
                Ok(row) => saved.push(row),
                Err(err) => {
                    skipped += 1;
                    warn!(
                        target: "generator",
                        index,
                        title = %idea.title,
                        error = %err,
                        "skipping idea"
                    );
                }
            }
        }
        (saved, skipped)
    }
}

impl std::fmt::Debug for IdeaGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdeaGenerator")
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"Sure! [{"type":"educational","title":"T","description":"D","hook":"H","cta":"C","relevance_score":80}] Hope that helps!"#;

    #[test]
    fn parses_bracketed_payload() {
        let ideas = parse_ideas(SAMPLE).unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].idea_type, "educational");
        assert_eq!(ideas[0].relevance_score, 80);

        let input = ideas[0].to_input(Some("book-1")).unwrap();
        assert_eq!(input.idea_type, IdeaType::Educational);
        assert_eq!(input.brief_description, "T: D");
        assert_eq!(input.relevance_score, Some(80));
        assert_eq!(input.metadata.unwrap()["hook"], "H");
    }

    #[test]
    fn malformed_array_is_validation_error() {
        let err = parse_ideas("[{\"type\": }]").unwrap_err();
        assert!(err.is_kind(ErrorKind::Validation));
        assert!(parse_ideas("nothing to see").unwrap_err().is_kind(ErrorKind::Validation));
    }

    #[test]
    fn invalid_fields_are_rejected_per_idea() {
        let base = GeneratedIdea {
            idea_type: "trend".into(),
            title: "Title".into(),
            relevance_score: 50,
            ..GeneratedIdea::default()
        };
        assert_eq!(base.to_input(None).unwrap().brief_description, "Title");

        let bad_type = GeneratedIdea {
            idea_type: "meme".into(),
            ..base.clone()
        };
        assert!(bad_type.to_input(None).unwrap_err().is_kind(ErrorKind::Validation));

        let bad_score = GeneratedIdea {
            relevance_score: 140,
            ..base.clone()
        };
        assert!(bad_score.to_input(None).is_err());

        let empty = GeneratedIdea {
            title: String::new(),
            ..base
        };
        assert!(empty.to_input(None).is_err());
    }
}
