#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use gagipress_core::{
    AppError, AppResult, Book, ContentIdea, ContentIdeaInput, ContentScript, ContentScriptInput,
    ContentStore, ErrorKind, IdeaStatus, IdeaType, ProviderKind, TextProvider,
};
use wiremock::MockServer;

/// In-memory content store that records every call.
#[derive(Default)]
pub struct MemoryStore {
    pub ideas: Mutex<Vec<ContentIdea>>,
    pub scripts: Mutex<Vec<ContentScript>>,
    pub status_updates: Mutex<Vec<(String, IdeaStatus)>>,
    pub reject_containing: Option<String>,
    pub fail_status_updates: bool,
    next_id: AtomicUsize,
}

impl MemoryStore {
    pub fn rejecting(marker: &str) -> Self {
        Self {
            reject_containing: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_status_updates() -> Self {
        Self {
            fail_status_updates: true,
            ..Self::default()
        }
    }

    pub fn idea_count(&self) -> usize {
        self.ideas.lock().unwrap().len()
    }

    pub fn script_count(&self) -> usize {
        self.scripts.lock().unwrap().len()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn create_idea(&self, input: &ContentIdeaInput) -> AppResult<ContentIdea> {
        input.validate()?;
        if let Some(marker) = &self.reject_containing {
            if input.brief_description.contains(marker.as_str()) {
                return Err(AppError::new(ErrorKind::Storage, "insert rejected"));
            }
        }
        let idea = ContentIdea {
            id: self.next_id("idea"),
            idea_type: input.idea_type,
            brief_description: input.brief_description.clone(),
            relevance_score: input.relevance_score,
            book_id: input.book_id.clone(),
            status: IdeaStatus::Pending,
            generated_at: Some(Utc::now()),
            metadata: input.metadata.clone(),
        };
        self.ideas.lock().unwrap().push(idea.clone());
        Ok(idea)
    }

    async fn create_script(&self, input: &ContentScriptInput) -> AppResult<ContentScript> {
        input.validate()?;
        let script = ContentScript {
            id: self.next_id("script"),
            idea_id: input.idea_id.clone(),
            hook: input.hook.clone(),
            full_script: input.full_script.clone(),
            cta: input.cta.clone(),
            hashtags: input.hashtags.clone(),
            music_suggestion: input.music_suggestion.clone(),
            video_notes: input.video_notes.clone(),
            estimated_duration: input.estimated_duration,
            created_at: Some(Utc::now()),
        };
        self.scripts.lock().unwrap().push(script.clone());
        Ok(script)
    }

    async fn update_idea_status(&self, id: &str, status: IdeaStatus) -> AppResult<()> {
        if self.fail_status_updates {
            return Err(AppError::new(ErrorKind::Storage, "update rejected"));
        }
        self.status_updates
            .lock()
            .unwrap()
            .push((id.to_string(), status));
        Ok(())
    }

    async fn list_ideas(
        &self,
        status: Option<IdeaStatus>,
        limit: usize,
    ) -> AppResult<Vec<ContentIdea>> {
        let ideas = self.ideas.lock().unwrap();
        let iter = ideas
            .iter()
            .filter(|idea| status.map(|wanted| idea.status == wanted).unwrap_or(true))
            .cloned();
        Ok(if limit == 0 {
            iter.collect()
        } else {
            iter.take(limit).collect()
        })
    }

    async fn find_idea(&self, id_or_prefix: &str) -> AppResult<ContentIdea> {
        self.ideas
            .lock()
            .unwrap()
            .iter()
            .find(|idea| idea.id.starts_with(id_or_prefix))
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("idea not found: {id_or_prefix}")))
    }
}

/// Provider double that returns a canned reply or error and records prompts.
pub struct RecordingProvider {
    kind: ProviderKind,
    reply: Result<String, ErrorKind>,
    pub prompts: Mutex<Vec<String>>,
    observed: Option<Arc<MockServer>>,
    pub requests_seen: Mutex<Vec<usize>>,
}

impl RecordingProvider {
    pub fn replying(kind: ProviderKind, reply: &str) -> Self {
        Self {
            kind,
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
            observed: None,
            requests_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(kind: ProviderKind, error: ErrorKind) -> Self {
        Self {
            reply: Err(error),
            ..Self::replying(kind, "")
        }
    }

    /// Records how many requests `server` had received each time this
    /// provider is invoked.
    pub fn observing(mut self, server: Arc<MockServer>) -> Self {
        self.observed = Some(server);
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextProvider for RecordingProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate(&self, prompt: &str, _temperature: f32) -> AppResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(server) = &self.observed {
            let seen = server
                .received_requests()
                .await
                .map(|requests| requests.len())
                .unwrap_or(0);
            self.requests_seen.lock().unwrap().push(seen);
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(kind) => Err(AppError::new(*kind, format!("{} unavailable", self.kind))),
        }
    }
}

pub fn sample_book() -> Book {
    Book {
        id: "book-1".into(),
        title: "Enigmi della Nonna".into(),
        genre: "Puzzle".into(),
        target_audience: Some("adulti".into()),
        kdp_asin: Some("B0TEST1234".into()),
        cover_image_url: None,
        publication_date: None,
        current_rank: None,
        total_sales: 0,
        created_at: None,
        updated_at: None,
    }
}

pub fn approved_idea() -> ContentIdea {
    ContentIdea {
        id: "0b3c1f9e-1111-2222-3333-444455556666".into(),
        idea_type: IdeaType::Educational,
        brief_description: "Tre enigmi: risolvili in 30 secondi".into(),
        relevance_score: Some(80),
        book_id: Some("book-1".into()),
        status: IdeaStatus::Approved,
        generated_at: None,
        metadata: None,
    }
}
