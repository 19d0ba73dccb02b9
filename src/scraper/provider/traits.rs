use crate::scraper::{
    Result,
    matcher::Disambiguation,
    types::{
        ExternalIds, Guess, IdType, Identifier, ImageType, MediaType, MetadataField,
        MetadataValue, PartialGuess,
    },
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// A named provider registered under its config name.
///
/// Each capability a plugin has is exposed through one of the `into_*`
/// conversions; the defaults report the capability as missing.
pub trait Plugin: Send + Sync + 'static {
    /// Provider identifier as used in the configuration (e.g., "tmdb")
    fn name(&self) -> &'static str;

    fn into_guess(self: Arc<Self>) -> Option<Arc<dyn GuessProvider>> {
        None
    }

    fn into_identifier(self: Arc<Self>) -> Option<Arc<dyn IdentifierProvider>> {
        None
    }

    fn into_metadata(self: Arc<Self>) -> Option<Arc<dyn MetadataProvider>> {
        None
    }

    fn into_images(self: Arc<Self>) -> Option<Arc<dyn ImageProvider>> {
        None
    }
}

/// Offers a guess about a video file.
#[async_trait]
pub trait GuessProvider: Plugin {
    /// `Ok(None)` when the provider has nothing to say about this file
    async fn guess(&self, filepath: &Path) -> Result<Option<PartialGuess>>;
}

/// Turns a guess into catalog ids.
#[async_trait]
pub trait IdentifierProvider: Plugin {
    /// Id namespaces this provider can fill for a media type
    fn supplied_ids(&self, media_type: MediaType) -> &'static [IdType];

    /// Ids found for the guess. `current` holds what earlier providers found,
    /// so a provider may look up by a known foreign id instead of searching.
    async fn identify(
        &self,
        guess: &Guess,
        current: &Identifier,
        disambiguation: &Disambiguation,
    ) -> Result<Option<ExternalIds>>;
}

/// Supplies metadata fields for identified media.
#[async_trait]
pub trait MetadataProvider: Plugin {
    /// Media types this provider has metadata for
    fn metadata_types(&self) -> &'static [MediaType];

    /// Ids the provider needs to look a media type up
    fn metadata_ids(&self, media_type: MediaType) -> &'static [IdType];

    async fn metadata(
        &self,
        identifier: &Identifier,
        field: MetadataField,
        language: &str,
    ) -> Result<Option<MetadataValue>>;
}

/// Supplies artwork URLs for identified media.
#[async_trait]
pub trait ImageProvider: Plugin {
    /// Media types this provider has images for
    fn image_types(&self) -> &'static [MediaType];

    /// Ids the provider needs to look a media type up
    fn image_ids(&self, media_type: MediaType) -> &'static [IdType];

    async fn image(
        &self,
        identifier: &Identifier,
        image_type: ImageType,
        language: &str,
    ) -> Result<Option<String>>;
}
