use super::traits::{GuessProvider, Plugin};
use crate::scraper::{
    Result,
    parser::Parser,
    types::{MediaType, PartialGuess},
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Guesses from scene-style filenames
#[derive(Debug, Default)]
pub struct FilenameProvider;

impl FilenameProvider {
    pub const NAME: &'static str = "filename";

    pub fn new() -> Self {
        Self
    }
}

impl Plugin for FilenameProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn into_guess(self: Arc<Self>) -> Option<Arc<dyn GuessProvider>> {
        Some(self)
    }
}

#[async_trait]
impl GuessProvider for FilenameProvider {
    async fn guess(&self, filepath: &Path) -> Result<Option<PartialGuess>> {
        let parsed = Parser::parse(filepath);
        if parsed.title.is_empty() && !parsed.is_episode() {
            return Ok(None);
        }

        let media_type = if parsed.is_episode() {
            MediaType::Episode
        } else {
            MediaType::Movie
        };

        Ok(Some(PartialGuess {
            media_type: Some(media_type),
            titles: Some(parsed.title)
                .filter(|t| !t.is_empty())
                .into_iter()
                .collect(),
            year: parsed.year,
            season: parsed.season,
            episodes: parsed.episodes,
            release_group: parsed.release_group,
            source: parsed.source,
            ..Default::default()
        }))
    }
}
