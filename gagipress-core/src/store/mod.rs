mod rest;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    Book, ContentIdea, ContentIdeaInput, ContentScript, ContentScriptInput, IdeaStatus,
};

pub use rest::RestStore;

/// Persistence for generated ideas and scripts.
///
/// Implementations must tolerate concurrent calls that touch different
/// records.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_idea(&self, input: &ContentIdeaInput) -> AppResult<ContentIdea>;

    async fn create_script(&self, input: &ContentScriptInput) -> AppResult<ContentScript>;

    async fn update_idea_status(&self, id: &str, status: IdeaStatus) -> AppResult<()>;

    /// Newest first. A `limit` of zero means no limit.
    async fn list_ideas(
        &self,
        status: Option<IdeaStatus>,
        limit: usize,
    ) -> AppResult<Vec<ContentIdea>>;

    /// Accepts a full id or an unambiguous prefix of at least eight characters.
    async fn find_idea(&self, id_or_prefix: &str) -> AppResult<ContentIdea>;
}

#[async_trait]
pub trait BookCatalog: Send + Sync {
    async fn get_book(&self, id: &str) -> AppResult<Book>;

    async fn list_books(&self) -> AppResult<Vec<Book>>;
}
