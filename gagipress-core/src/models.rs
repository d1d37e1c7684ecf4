use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub genre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdp_asin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_rank: Option<i64>,
    #[serde(default)]
    pub total_sales: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Book {
    pub fn target_audience(&self) -> &str {
        self.target_audience.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaType {
    Educational,
    Entertainment,
    #[serde(alias = "behind-the-scenes", alias = "behind_the_scenes")]
    Bts,
    #[serde(alias = "user-generated", alias = "user_generated")]
    Ugc,
    Trend,
}

impl IdeaType {
    pub const ALL: [IdeaType; 5] = [
        IdeaType::Educational,
        IdeaType::Entertainment,
        IdeaType::Bts,
        IdeaType::Ugc,
        IdeaType::Trend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaType::Educational => "educational",
            IdeaType::Entertainment => "entertainment",
            IdeaType::Bts => "bts",
            IdeaType::Ugc => "ugc",
            IdeaType::Trend => "trend",
        }
    }
}

impl fmt::Display for IdeaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdeaType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "educational" => Ok(IdeaType::Educational),
            "entertainment" => Ok(IdeaType::Entertainment),
            "bts" | "behind-the-scenes" | "behind_the_scenes" => Ok(IdeaType::Bts),
            "ugc" | "user-generated" | "user_generated" => Ok(IdeaType::Ugc),
            "trend" => Ok(IdeaType::Trend),
            "" => Err(AppError::validation("type is required")),
            other => Err(AppError::validation(format!("invalid idea type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    Pending,
    Approved,
    Rejected,
    Scripted,
}

impl IdeaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::Pending => "pending",
            IdeaStatus::Approved => "approved",
            IdeaStatus::Rejected => "rejected",
            IdeaStatus::Scripted => "scripted",
        }
    }
}

impl fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Tiktok,
    Instagram,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentIdea {
    pub id: String,
    #[serde(rename = "type")]
    pub idea_type: IdeaType,
    pub brief_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    pub status: IdeaStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ContentIdea {
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContentIdeaInput {
    #[serde(rename = "type")]
    pub idea_type: IdeaType,
    pub brief_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ContentIdeaInput {
    pub fn validate(&self) -> AppResult<()> {
        if self.brief_description.trim().is_empty() {
            return Err(AppError::validation("brief description is required"));
        }
        if matches!(self.relevance_score, Some(score) if score > 100) {
            return Err(AppError::validation("relevance score must be between 0 and 100"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentScript {
    pub id: String,
    pub idea_id: String,
    pub hook: String,
    pub full_script: String,
    pub cta: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_notes: Option<String>,
    pub estimated_duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContentScriptInput {
    pub idea_id: String,
    pub hook: String,
    pub full_script: String,
    pub cta: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music_suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_notes: Option<String>,
    pub estimated_duration: u32,
}

impl ContentScriptInput {
    pub fn validate(&self) -> AppResult<()> {
        let required = [
            ("idea_id", &self.idea_id),
            ("hook", &self.hook),
            ("full_script", &self.full_script),
            ("cta", &self.cta),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}
