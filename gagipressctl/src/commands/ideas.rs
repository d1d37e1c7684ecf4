use clap::{Args, Subcommand, ValueEnum};
use gagipress_core::{ContentIdea, ContentStore, IdeaStatus};
use serde::Serialize;
use tracing::info;

use crate::{AppContext, DisplayFallback, Result};

const DESCRIPTION_WIDTH: usize = 60;

#[derive(Subcommand, Debug)]
pub enum IdeaCommands {
    /// List stored ideas, newest first
    List(IdeaListArgs),
    /// Mark an idea as approved so a script can be generated from it
    Approve(IdeaRefArgs),
    /// Mark an idea as rejected
    Reject(IdeaRefArgs),
}

#[derive(Args, Debug)]
pub struct IdeaRefArgs {
    /// Idea id or 8-character prefix
    pub idea: String,
}

#[derive(Args, Debug)]
pub struct IdeaListArgs {
    /// Only ideas in this status
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,
    /// Maximum rows (0 for all)
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Pending,
    Approved,
    Rejected,
    Scripted,
}

impl From<StatusArg> for IdeaStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => IdeaStatus::Pending,
            StatusArg::Approved => IdeaStatus::Approved,
            StatusArg::Rejected => IdeaStatus::Rejected,
            StatusArg::Scripted => IdeaStatus::Scripted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IdeaList {
    pub rows: Vec<ContentIdea>,
}

pub(crate) async fn list_ideas(context: &AppContext, args: &IdeaListArgs) -> Result<IdeaList> {
    let rows = context
        .store
        .list_ideas(args.status.map(IdeaStatus::from), args.limit)
        .await?;
    Ok(IdeaList { rows })
}

#[derive(Debug, Clone, Serialize)]
pub struct IdeaStatusChange {
    pub idea_id: String,
    pub previous: IdeaStatus,
    pub status: IdeaStatus,
}

pub(crate) async fn set_idea_status(
    context: &AppContext,
    args: &IdeaRefArgs,
    status: IdeaStatus,
) -> Result<IdeaStatusChange> {
    let idea = context.store.find_idea(&args.idea).await?;
    context.store.update_idea_status(&idea.id, status).await?;
    info!(idea_id = %idea.id, from = %idea.status, to = %status, "idea status updated");
    Ok(IdeaStatusChange {
        idea_id: idea.id,
        previous: idea.status,
        status,
    })
}

impl DisplayFallback for IdeaStatusChange {
    fn display(&self) -> String {
        let mut text = format!(
            "Idea {} {} (was {})",
            self.idea_id, self.status, self.previous
        );
        if self.status == IdeaStatus::Approved {
            text.push_str(&format!(
                "\nNext step: gagipressctl generate script {}",
                self.idea_id
            ));
        }
        text
    }
}

impl DisplayFallback for IdeaList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No ideas found.".to_string();
        }
        let mut lines = vec![format!(
            "{:<8}  {:<9}  {:<13}  {:>5}  DESCRIPTION",
            "ID", "STATUS", "TYPE", "SCORE"
        )];
        for idea in &self.rows {
            let score = idea
                .relevance_score
                .map(|score| score.to_string())
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "{:<8}  {:<9}  {:<13}  {:>5}  {}",
                idea.short_id(),
                idea.status.as_str(),
                idea.idea_type.as_str(),
                score,
                truncate(&idea.brief_description, DESCRIPTION_WIDTH)
            ));
        }
        lines.push(format!("{} idea(s)", self.rows.len()));
        lines.join("\n")
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
