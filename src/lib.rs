//! QzEmoji
//!
//! Translates Qzone emoji ids into text. Lookups are served from a local
//! SQLite store made of two tables: a base table replaced wholesale from a
//! published snapshot, and an override table holding the user's own entries.
//! The base table is synchronized from the remote release at most once per
//! handle, and only when the remote fingerprint differs from the local one.
//!
//! ```no_run
//! # async fn demo() -> qzemoji::Result<()> {
//! use qzemoji::{Config, Fallback, QzEmoji};
//!
//! let emoji = QzEmoji::new(Config::load(None)?);
//! emoji.set(400343, "pig").await?;
//! assert_eq!(emoji.query(400343, &Fallback::Id).await?, "pig");
//! assert_eq!(emoji.query(-1, &Fallback::from("?")).await?, "?");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod fingerprint;
pub mod mirror;
pub mod resolve;
pub mod snapshot;
pub mod sync;

mod emoji;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use db::Entry;
pub use emoji::{Fallback, QzEmoji};
pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use resolve::{resolve, resolve_tag, resolve_url, to_tag};
pub use sync::{SyncOutcome, SyncPhase};

/// Release this build's bundled data corresponds to.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
