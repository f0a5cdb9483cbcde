//! Builtin tools
//!
//! Thin adapters over external services. Each one is registered in the
//! factory table under a `kind` that manifests refer to.

mod mail;
mod recipe;
mod spotify;
mod wikipedia;

pub use mail::{Email, ImapMailbox, MailSummarizerTool, Mailbox};
pub use recipe::{Recipe, RecipeSearchTool};
pub use spotify::{Song, SpotifyApi, SpotifyClient, SpotifyPlaylistTool};
pub use wikipedia::{Verdict, WikipediaFactCheckTool};

use std::sync::Arc;

use crate::error::{Result, ThursdayError};
use crate::tools::{Tool, ToolFactories};

/// Register every builtin kind
pub fn register_all(factories: &mut ToolFactories) {
    factories.register("mail_summary", |env, settings| {
        Ok(Arc::new(MailSummarizerTool::from_settings(env, settings)?) as Arc<dyn Tool>)
    });
    factories.register("recipe_search", |env, settings| {
        Ok(Arc::new(RecipeSearchTool::from_settings(env, settings)?) as Arc<dyn Tool>)
    });
    factories.register("spotify_playlist", |env, settings| {
        Ok(Arc::new(SpotifyPlaylistTool::from_settings(env, settings)?) as Arc<dyn Tool>)
    });
    factories.register("wikipedia_fact_check", |env, settings| {
        Ok(Arc::new(WikipediaFactCheckTool::from_settings(env, settings)?) as Arc<dyn Tool>)
    });
}

/// Optional string setting; present but not a string is an error
fn setting_str<'a>(settings: &'a toml::Table, key: &str) -> Result<Option<&'a str>> {
    match settings.get(key) {
        None => Ok(None),
        Some(toml::Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ThursdayError::Config(format!(
            "setting '{}' must be a string, got {}",
            key,
            other.type_str()
        ))),
    }
}

/// Optional positive integer setting
fn setting_u64(settings: &toml::Table, key: &str) -> Result<Option<u64>> {
    match settings.get(key) {
        None => Ok(None),
        Some(toml::Value::Integer(n)) if *n > 0 => Ok(Some(*n as u64)),
        Some(other) => Err(ThursdayError::Config(format!(
            "setting '{}' must be a positive integer, got {}",
            key, other
        ))),
    }
}
