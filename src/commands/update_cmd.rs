use clap::Args;

use qzemoji::{QzEmoji, SyncOutcome};

/// Synchronize the base table with the published snapshot
#[derive(Args)]
pub struct UpdateCommand {
    /// Synchronize even if auto-update is disabled
    #[arg(long, short)]
    force: bool,
}

impl UpdateCommand {
    pub async fn run(&self, emoji: &QzEmoji) -> Result<(), Box<dyn std::error::Error>> {
        let outcome = if self.force {
            emoji.update().await?
        } else {
            match emoji.auto_update().await? {
                Some(outcome) => outcome,
                None => {
                    println!("Auto-update is disabled. Use --force to update anyway.");
                    return Ok(());
                }
            }
        };

        match outcome {
            SyncOutcome::Unchanged => println!("Already up to date."),
            SyncOutcome::Updated {
                entries,
                fingerprint,
            } => {
                println!("Updated {} entries.", entries);
                println!("Fingerprint: {}", fingerprint);
            }
            SyncOutcome::Failed(reason) => {
                println!("Update failed: {}", reason);
                println!("Local data was left unchanged.");
            }
        }

        Ok(())
    }
}
