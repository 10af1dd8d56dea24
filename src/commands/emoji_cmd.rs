use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use qzemoji::{resolve, Fallback, QzEmoji, SyncOutcome};

use super::OutputFormat;

/// Look up emoji text
#[derive(Args)]
pub struct QueryCommand {
    /// Emoji ids
    ids: Vec<i64>,

    /// Emoji asset URL, e.g. http://qzonestyle.gtimg.cn/qzone/em/e400343.gif
    #[arg(long)]
    url: Option<String>,

    /// Emoji tag, e.g. [em]e400343[/em]
    #[arg(long)]
    tag: Option<String>,

    /// Text printed for ids without an entry (defaults to the id)
    #[arg(long, short)]
    default: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl QueryCommand {
    pub async fn run(&self, emoji: &QzEmoji) -> Result<(), Box<dyn std::error::Error>> {
        let mut ids = self.ids.clone();
        if self.url.is_some() || self.tag.is_some() {
            ids.push(resolve(self.url.as_deref(), self.tag.as_deref())?);
        }
        if ids.is_empty() {
            return Err("No emoji id given; pass an id, --url or --tag".into());
        }

        let fallback = match &self.default {
            Some(text) => Fallback::from(text.as_str()),
            None => Fallback::Id,
        };

        match self.format {
            OutputFormat::Text => {
                for id in ids {
                    println!("{}", emoji.query(id, &fallback).await?);
                }
            }
            OutputFormat::Json => {
                let mut found = BTreeMap::new();
                for id in ids {
                    found.insert(id, emoji.lookup(id).await?);
                }
                println!("{}", serde_json::to_string_pretty(&found)?);
            }
        }

        Ok(())
    }
}

/// Set your own text for an emoji id
#[derive(Args)]
pub struct SetCommand {
    /// Emoji id
    id: i64,

    /// Text to show for the emoji
    text: String,
}

impl SetCommand {
    pub async fn run(&self, emoji: &QzEmoji) -> Result<(), Box<dyn std::error::Error>> {
        emoji.set(self.id, &self.text).await?;
        println!("Set {} = {}", self.id, self.text);
        Ok(())
    }
}

/// Export the merged table as YAML
#[derive(Args)]
pub struct ExportCommand {
    /// Output file
    #[arg(default_value = "emoji.yml")]
    path: PathBuf,
}

impl ExportCommand {
    pub async fn run(&self, emoji: &QzEmoji) -> Result<(), Box<dyn std::error::Error>> {
        let path = emoji.export(&self.path).await?;
        println!("Exported to {}", path.display());
        Ok(())
    }
}

/// Replace the base table from a local snapshot file
#[derive(Args)]
pub struct ImportCommand {
    /// Snapshot file (SQLite with an Emoji table)
    snapshot: PathBuf,
}

impl ImportCommand {
    pub async fn run(&self, emoji: &QzEmoji) -> Result<(), Box<dyn std::error::Error>> {
        match emoji.update_from(&self.snapshot).await? {
            SyncOutcome::Updated { entries, .. } => {
                println!("Imported {} entries from {}", entries, self.snapshot.display())
            }
            SyncOutcome::Unchanged => println!("Base table already matches the snapshot."),
            SyncOutcome::Failed(reason) => return Err(reason.into()),
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Fingerprints {
    base: String,
    overrides: String,
}

/// Show fingerprints of the local tables
#[derive(Args)]
pub struct FingerprintCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl FingerprintCommand {
    pub async fn run(&self, emoji: &QzEmoji) -> Result<(), Box<dyn std::error::Error>> {
        let (base, overrides) = emoji.fingerprints().await?;

        match self.format {
            OutputFormat::Json => {
                let fingerprints = Fingerprints {
                    base: base.to_string(),
                    overrides: overrides.to_string(),
                };
                println!("{}", serde_json::to_string_pretty(&fingerprints)?);
            }
            OutputFormat::Text => {
                println!("base:      {}", base);
                println!("overrides: {}", overrides);
            }
        }

        Ok(())
    }
}
