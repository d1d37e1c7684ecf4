use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::SupabaseSection;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::llm::HttpError;
use crate::models::{
    Book, ContentIdea, ContentIdeaInput, ContentScript, ContentScriptInput, IdeaStatus,
};

use super::{BookCatalog, ContentStore};

const IDEAS_TABLE: &str = "content_ideas";
const SCRIPTS_TABLE: &str = "content_scripts";
const BOOKS_TABLE: &str = "books";
const MIN_PREFIX_LEN: usize = 8;
const FULL_ID_LEN: usize = 36;

/// Supabase storage through its PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(config: &SupabaseSection) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| AppError::wrap(err, ErrorKind::Storage, "failed to build http client"))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key().to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch<T: DeserializeOwned + Send>(
        &self,
        builder: RequestBuilder,
        action: &str,
    ) -> AppResult<Vec<T>> {
        let body = self.execute(builder, action).await?;
        serde_json::from_str(&body).map_err(|err| {
            AppError::wrap(err, ErrorKind::Storage, format!("failed to decode {action} response"))
        })
    }

    async fn execute(&self, builder: RequestBuilder, action: &str) -> AppResult<String> {
        let response = builder
            .send()
            .await
            .map_err(|err| AppError::wrap(err, ErrorKind::Storage, format!("failed to {action}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AppError::wrap(err, ErrorKind::Storage, format!("failed to {action}")))?;
        if !status.is_success() {
            return Err(AppError::wrap(
                HttpError {
                    status: status.as_u16(),
                    message: body,
                },
                ErrorKind::Storage,
                format!("failed to {action}"),
            ));
        }
        Ok(body)
    }

    async fn insert<I, T>(&self, table: &str, input: &I, action: &str) -> AppResult<T>
    where
        I: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let builder = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(input);
        self.fetch::<T>(builder, action)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::new(ErrorKind::Storage, format!("{action}: no row returned")))
    }

    async fn find_by_id<T: DeserializeOwned + Send>(
        &self,
        table: &str,
        id: &str,
        action: &str,
    ) -> AppResult<Option<T>> {
        let builder = self
            .request(Method::GET, table)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);
        Ok(self.fetch::<T>(builder, action).await?.into_iter().next())
    }
}

#[async_trait]
impl ContentStore for RestStore {
    async fn create_idea(&self, input: &ContentIdeaInput) -> AppResult<ContentIdea> {
        input.validate()?;
        let idea: ContentIdea = self.insert(IDEAS_TABLE, input, "create idea").await?;
        debug!(target: "store", idea_id = %idea.id, "idea stored");
        Ok(idea)
    }

    async fn create_script(&self, input: &ContentScriptInput) -> AppResult<ContentScript> {
        input.validate()?;
        let script: ContentScript = self.insert(SCRIPTS_TABLE, input, "create script").await?;
        debug!(target: "store", script_id = %script.id, idea_id = %script.idea_id, "script stored");
        Ok(script)
    }

    async fn update_idea_status(&self, id: &str, status: IdeaStatus) -> AppResult<()> {
        let builder = self
            .request(Method::PATCH, IDEAS_TABLE)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "status": status }));
        self.execute(builder, "update idea").await.map(|_| ())
    }

    async fn list_ideas(
        &self,
        status: Option<IdeaStatus>,
        limit: usize,
    ) -> AppResult<Vec<ContentIdea>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "generated_at.desc".to_string()),
        ];
        if let Some(status) = status {
            query.push(("status", format!("eq.{status}")));
        }
        if limit > 0 {
            query.push(("limit", limit.to_string()));
        }
        let builder = self.request(Method::GET, IDEAS_TABLE).query(&query);
        self.fetch(builder, "list ideas").await
    }

    async fn find_idea(&self, id_or_prefix: &str) -> AppResult<ContentIdea> {
        let needle = id_or_prefix.trim();
        if needle.len() >= FULL_ID_LEN {
            return self
                .find_by_id(IDEAS_TABLE, needle, "get idea")
                .await?
                .ok_or_else(|| AppError::not_found(format!("idea not found: {needle}")));
        }
        if needle.len() < MIN_PREFIX_LEN {
            return Err(AppError::validation(format!(
                "idea id prefix must be at least {MIN_PREFIX_LEN} characters"
            )));
        }

        let mut matches: Vec<ContentIdea> = self
            .list_ideas(None, 0)
            .await?
            .into_iter()
            .filter(|idea| idea.id.starts_with(needle))
            .collect();
        match matches.len() {
            0 => Err(AppError::not_found(format!("idea not found: {needle}"))),
            1 => Ok(matches.remove(0)),
            count => Err(AppError::validation(format!(
                "idea prefix {needle} is ambiguous ({count} matches)"
            ))),
        }
    }
}

#[async_trait]
impl BookCatalog for RestStore {
    async fn get_book(&self, id: &str) -> AppResult<Book> {
        self.find_by_id(BOOKS_TABLE, id, "get book")
            .await?
            .ok_or_else(|| AppError::not_found(format!("book not found: {id}")))
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let builder = self
            .request(Method::GET, BOOKS_TABLE)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        self.fetch(builder, "list books").await
    }
}
