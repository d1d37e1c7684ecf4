use std::sync::Arc;

use clap::{Args, Subcommand, ValueEnum};
use gagipress_core::{
    Book, BookCatalog, BookNiche, ContentStore, ErrorKind, IdeaGenerator, Platform, ProviderKind,
    ProviderPreference, ScriptGenerator, ScriptReport, Spinner,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{AppContext, DisplayFallback, Result};

const RULE_WIDTH: usize = 60;

#[derive(Subcommand, Debug)]
pub enum GenerateCommands {
    /// Generate content ideas for one book or the whole catalog
    Ideas(GenerateIdeasArgs),
    /// Turn an approved idea into a full script
    Script(GenerateScriptArgs),
}

#[derive(Args, Debug)]
pub struct GenerateIdeasArgs {
    /// Book id; every book in the catalog when omitted
    #[arg(long)]
    pub book: Option<String>,
    /// Ideas requested per book
    #[arg(long, default_value_t = 20)]
    pub count: usize,
    /// Use the Gemini web chat instead of OpenAI
    #[arg(long)]
    pub gemini: bool,
}

#[derive(Args, Debug)]
pub struct GenerateScriptArgs {
    /// Idea id or 8-character prefix
    pub idea: String,
    /// Target platform
    #[arg(long, value_enum, default_value_t = PlatformArg::Tiktok)]
    pub platform: PlatformArg,
    /// Use the Gemini web chat instead of OpenAI
    #[arg(long)]
    pub gemini: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    Tiktok,
    Instagram,
}

impl From<PlatformArg> for Platform {
    fn from(value: PlatformArg) -> Self {
        match value {
            PlatformArg::Tiktok => Platform::Tiktok,
            PlatformArg::Instagram => Platform::Instagram,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookOutcome {
    pub book_id: String,
    pub title: String,
    pub niche: BookNiche,
    pub provider: Option<ProviderKind>,
    pub generated: usize,
    pub saved: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IdeaGenerationSummary {
    pub books: Vec<BookOutcome>,
    pub total_generated: usize,
    pub total_saved: usize,
    pub total_skipped: usize,
    pub failed_books: usize,
}

impl IdeaGenerationSummary {
    fn record(&mut self, outcome: BookOutcome) {
        self.total_generated += outcome.generated;
        self.total_saved += outcome.saved;
        self.total_skipped += outcome.skipped;
        if outcome.error.is_some() {
            self.failed_books += 1;
        }
        self.books.push(outcome);
    }
}

pub(crate) async fn generate_ideas(
    context: &AppContext,
    args: &GenerateIdeasArgs,
) -> Result<IdeaGenerationSummary> {
    let books = match &args.book {
        Some(id) => vec![context.store.get_book(id).await?],
        None => context.store.list_books().await?,
    };
    let mut summary = IdeaGenerationSummary::default();
    if books.is_empty() {
        warn!("no books in catalog");
        return Ok(summary);
    }

    let store: Arc<dyn ContentStore> = context.store.clone();
    let generator = IdeaGenerator::new(context.providers()?, store);
    let preference = ProviderPreference::from_automation_flag(args.gemini);
    info!(books = books.len(), per_book = args.count, "generating ideas");

    for book in books {
        let outcome = generate_for_book(&generator, &book, args.count, preference).await?;
        summary.record(outcome);
    }
    Ok(summary)
}

/// Failures are recorded on the outcome; only cancellation aborts the batch.
async fn generate_for_book(
    generator: &IdeaGenerator,
    book: &Book,
    count: usize,
    preference: ProviderPreference,
) -> Result<BookOutcome> {
    let niche = BookNiche::from_genre(&book.genre);
    let mut outcome = BookOutcome {
        book_id: book.id.clone(),
        title: book.title.clone(),
        niche,
        provider: None,
        generated: 0,
        saved: 0,
        skipped: 0,
        error: None,
    };

    let spinner = Spinner::start(format!("Generating {count} ideas for {}", book.title));
    let result = generator.run(book, count, preference).await;
    spinner.finish().await;

    match result {
        Ok(report) => {
            outcome.provider = Some(report.provider);
            outcome.generated = report.generated;
            outcome.saved = report.saved_count();
            outcome.skipped = report.skipped;
        }
        Err(err) if err.is_kind(ErrorKind::Cancelled) => return Err(err.into()),
        Err(err) => {
            error!(book_id = %book.id, error = %err, "idea generation failed");
            outcome.error = Some(err.to_string());
        }
    }
    Ok(outcome)
}

impl DisplayFallback for IdeaGenerationSummary {
    fn display(&self) -> String {
        if self.books.is_empty() {
            return "No books in catalog.".to_string();
        }
        let mut lines = Vec::new();
        for book in &self.books {
            lines.push(format!("Book: {} ({})", book.title, book.niche));
            match (&book.error, book.provider) {
                (Some(error), _) => lines.push(format!("  failed: {error}")),
                (None, Some(provider)) => lines.push(format!(
                    "  {provider}: generated {}, saved {}, skipped {}",
                    book.generated, book.saved, book.skipped
                )),
                (None, None) => {}
            }
        }
        lines.push("=".repeat(RULE_WIDTH));
        lines.push(format!("Total generated: {}", self.total_generated));
        lines.push(format!("Total saved: {}", self.total_saved));
        lines.push(format!("Total skipped: {}", self.total_skipped));
        if self.failed_books > 0 {
            lines.push(format!("Books failed: {}", self.failed_books));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptOutput {
    pub idea_id: String,
    pub book_title: Option<String>,
    pub platform: Platform,
    #[serde(flatten)]
    pub report: ScriptReport,
}

pub(crate) async fn generate_script(
    context: &AppContext,
    args: &GenerateScriptArgs,
) -> Result<ScriptOutput> {
    let idea = context.store.find_idea(&args.idea).await?;
    let book = match idea.book_id.as_deref() {
        Some(book_id) => match context.store.get_book(book_id).await {
            Ok(book) => Some(book),
            Err(err) => {
                warn!(book_id, error = %err, "book lookup failed, using placeholder title");
                None
            }
        },
        None => None,
    };

    let store: Arc<dyn ContentStore> = context.store.clone();
    let generator = ScriptGenerator::new(
        context.providers()?,
        store,
        context.config.amazon.clone(),
    );
    let platform = Platform::from(args.platform);
    let preference = ProviderPreference::from_automation_flag(args.gemini);

    let spinner = Spinner::start("Generating script");
    let result = generator.run(&idea, book.as_ref(), platform, preference).await;
    spinner.finish().await;

    Ok(ScriptOutput {
        idea_id: idea.id,
        book_title: book.map(|book| book.title),
        platform,
        report: result?,
    })
}

impl DisplayFallback for ScriptOutput {
    fn display(&self) -> String {
        let generated = &self.report.generated;
        let rule = "-".repeat(RULE_WIDTH);
        let mut lines = vec![
            format!(
                "Script {} for idea {} ({})",
                self.report.script.id, self.idea_id, self.platform
            ),
            "=".repeat(RULE_WIDTH),
            "HOOK".to_string(),
            rule.clone(),
            generated.hook.clone(),
            String::new(),
            "MAIN CONTENT".to_string(),
            rule.clone(),
            generated.main_content.clone(),
            String::new(),
            "CALL-TO-ACTION".to_string(),
            rule.clone(),
            generated.cta.clone(),
            String::new(),
            "HASHTAGS".to_string(),
            rule.clone(),
            generated.hashtags.join(" "),
        ];
        for (title, body) in [
            ("MUSIC SUGGESTION", &generated.music_suggestion),
            ("VIDEO NOTES", &generated.video_notes),
        ] {
            if !body.trim().is_empty() {
                lines.extend([String::new(), title.to_string(), rule.clone(), body.clone()]);
            }
        }
        lines.push(String::new());
        lines.push(format!("Estimated length: {} seconds", generated.estimated_length));
        lines.push(format!("Provider: {}", self.report.provider));
        if !self.report.status_updated {
            lines.push("Warning: idea status was not updated to scripted".to_string());
        }
        lines.join("\n")
    }
}
