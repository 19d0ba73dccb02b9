use crate::scraper::{
    Result,
    cache::{ResolvedKey, ScraperCache},
    provider::{ImageProvider, MetadataProvider},
    types::{Identifier, ImageSet, ImageType, MediaType, Metadata, MetadataField, MetadataValue},
};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

/// Providers in priority order per key, with a default list for keys
/// without an override.
pub struct ProviderTable<K, P: ?Sized> {
    default: Vec<Arc<P>>,
    overrides: HashMap<K, Vec<Arc<P>>>,
}

impl<K: Hash + Eq, P: ?Sized> ProviderTable<K, P> {
    pub fn new(default: Vec<Arc<P>>) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_override(mut self, key: K, providers: Vec<Arc<P>>) -> Self {
        self.overrides.insert(key, providers);
        self
    }

    pub fn providers(&self, key: &K) -> &[Arc<P>] {
        self.overrides.get(key).unwrap_or(&self.default)
    }
}

/// Resolves metadata and images of identified media.
///
/// For every field the languages are tried in priority order, and for each
/// language the providers; the first non-null value wins and nothing else is
/// asked for that field. Results are cached per identifier and language list.
pub struct MetadataResolver {
    metadata: ProviderTable<MetadataField, dyn MetadataProvider>,
    images: ProviderTable<ImageType, dyn ImageProvider>,
    languages: Vec<String>,
    cache: ScraperCache,
}

impl MetadataResolver {
    pub fn new(
        metadata: ProviderTable<MetadataField, dyn MetadataProvider>,
        images: ProviderTable<ImageType, dyn ImageProvider>,
        languages: Vec<String>,
        cache: ScraperCache,
    ) -> Self {
        Self {
            metadata,
            images,
            languages,
            cache,
        }
    }

    fn key(&self, identifier: &Identifier) -> ResolvedKey {
        ResolvedKey {
            identifier: identifier.clone(),
            languages: self.languages.clone(),
        }
    }

    /// Metadata of `identifier`; show-level fields of episodes and seasons
    /// come from the parent show.
    pub async fn metadata(&self, identifier: &Identifier) -> Result<Arc<Metadata>> {
        let key = self.key(identifier);
        self.cache
            .metadata
            .get_or_compute(key, move || async move {
                self.resolve_metadata(identifier).await.map(Arc::new)
            })
            .await
    }

    pub async fn images(&self, identifier: &Identifier) -> Result<Arc<ImageSet>> {
        let key = self.key(identifier);
        self.cache
            .images
            .get_or_compute(key, move || async move {
                self.resolve_images(identifier).await.map(Arc::new)
            })
            .await
    }

    async fn resolve_metadata(&self, identifier: &Identifier) -> Result<Metadata> {
        let media_type = identifier.media_type;
        let inherited = media_type.inherited_fields();
        let mut show: Option<Arc<Metadata>> = None;
        let mut metadata = Metadata::new();

        for &field in media_type.metadata_fields() {
            let value = match inherited.iter().find(|(own, _)| *own == field) {
                Some(&(_, show_field)) => {
                    if show.is_none() {
                        let parent = identifier.successor(MediaType::TvShow);
                        show = Some(Box::pin(self.metadata(&parent)).await?);
                    }
                    show.as_ref().and_then(|show| show.get(show_field)).cloned()
                }
                None => self.resolve_field(identifier, field).await?,
            };

            if let Some(value) = value {
                metadata.set(field, value);
            }
        }

        Ok(metadata)
    }

    async fn resolve_field(
        &self,
        identifier: &Identifier,
        field: MetadataField,
    ) -> Result<Option<MetadataValue>> {
        let providers = self.metadata.providers(&field);

        for language in &self.languages {
            for provider in providers {
                if !provider.metadata_types().contains(&identifier.media_type) {
                    continue;
                }
                if let Some(value) = provider.metadata(identifier, field, language).await? {
                    if !value.is_empty() {
                        debug!("{} {} from {} ({})", identifier, field, provider.name(), language);
                        return Ok(Some(value));
                    }
                }
            }
        }

        Ok(None)
    }

    async fn resolve_images(&self, identifier: &Identifier) -> Result<ImageSet> {
        let mut images = ImageSet::new();

        for &image_type in identifier.media_type.image_types() {
            if let Some(url) = self.resolve_image(identifier, image_type).await? {
                images.set(image_type, url);
            }
        }

        Ok(images)
    }

    async fn resolve_image(
        &self,
        identifier: &Identifier,
        image_type: ImageType,
    ) -> Result<Option<String>> {
        let providers = self.images.providers(&image_type);

        for language in &self.languages {
            for provider in providers {
                if !provider.image_types().contains(&identifier.media_type) {
                    continue;
                }
                if let Some(url) = provider.image(identifier, image_type, language).await? {
                    if !url.trim().is_empty() {
                        debug!(
                            "{} {} from {} ({})",
                            identifier,
                            image_type.as_str(),
                            provider.name(),
                            language
                        );
                        return Ok(Some(url));
                    }
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderTable;
    use std::sync::Arc;

    #[test]
    fn test_provider_table_override() {
        let table: ProviderTable<&str, str> = ProviderTable::new(vec![Arc::from("tmdb")])
            .with_override("logo", vec![Arc::from("fanarttv")]);

        assert_eq!(&*table.providers(&"title")[0], "tmdb");
        assert_eq!(&*table.providers(&"logo")[0], "fanarttv");
    }

    #[test]
    fn test_empty_override_disables_key() {
        let table: ProviderTable<&str, str> =
            ProviderTable::new(vec![Arc::from("tmdb")]).with_override("actors", Vec::new());

        assert!(table.providers(&"actors").is_empty());
    }
}
