mod automation;
mod chat;
mod error;

pub use automation::{BrowserAutomation, BrowserContext, BrowserLauncher, ViewportSpec};
pub use chat::GeminiClient;
pub use error::{BrowserError, BrowserResult};
