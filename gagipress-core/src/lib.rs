pub mod browser;
pub mod config;
pub mod error;
pub mod generator;
pub mod llm;
pub mod models;
pub mod progress;
pub mod prompts;
pub mod retry;
pub mod store;

pub use browser::{BrowserError, GeminiClient};
pub use config::{
    default_config_path, load_gagipress_config, AmazonSection, GagipressConfig, GeminiSection,
    OpenAiSection, SupabaseSection,
};
pub use error::{is_kind, AppError, AppResult, ConfigError, ErrorKind, Result};
pub use generator::{
    GeneratedIdea, GeneratedScript, IdeaBatchReport, IdeaGenerator, ProviderPreference,
    ProviderSelection, Providers, ScriptGenerator, ScriptReport,
};
pub use llm::{HttpError, OpenAiClient, ProviderKind, TextProvider};
pub use models::{
    Book, ContentIdea, ContentIdeaInput, ContentScript, ContentScriptInput, IdeaStatus, IdeaType,
    Platform,
};
pub use progress::Spinner;
pub use prompts::BookNiche;
pub use retry::{retry, retry_if, RetryPolicy};
pub use store::{BookCatalog, ContentStore, RestStore};
