use crate::config::{PluginSettings, Settings};
use crate::scraper::{
    Result, ScraperError,
    cache::ScraperCache,
    provider::{
        FanartProvider, FilenameProvider, GuessProvider, IdentifierProvider, ImageProvider,
        MetadataProvider, NfoProvider, Plugin, TmdbProvider,
    },
    resolver::{MetadataResolver, ProviderTable},
    types::{IdType, ImageType, MediaType, MetadataField},
};
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Providers by configured name
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<&'static str, Arc<dyn Plugin>>,
    /// Known providers left out of this run, with the reason
    disabled: HashMap<&'static str, &'static str>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every built-in provider the settings allow
    pub async fn from_settings(settings: &Settings, cache: &ScraperCache) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(FilenameProvider::new()));
        registry.register(Arc::new(NfoProvider::new()));

        if settings.tmdb.api_key.is_some() {
            let tmdb = TmdbProvider::connect(&settings.tmdb, cache.clone()).await?;
            registry.register(Arc::new(tmdb));
        } else {
            registry.disable("tmdb", "tmdb.api_key is not set");
        }

        if settings.fanarttv.api_key.is_some() {
            let fanart = FanartProvider::new(&settings.fanarttv, cache.clone())?;
            registry.register(Arc::new(fanart));
        } else {
            registry.disable("fanarttv", "fanarttv.api_key is not set");
        }

        info!("Registered providers: {}", registry.names().join(", "));
        Ok(registry)
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        let name = plugin.name();
        self.disabled.remove(name);
        self.plugins.insert(name, plugin);
    }

    pub fn disable(&mut self, name: &'static str, reason: &'static str) {
        debug!("Provider {} disabled: {}", name, reason);
        self.plugins.remove(name);
        self.disabled.insert(name, reason);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.plugins.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Plugin>> {
        if let Some(plugin) = self.plugins.get(name) {
            return Ok(Arc::clone(plugin));
        }

        Err(ScraperError::InvalidConfig(match self.disabled.get(name) {
            Some(reason) => format!("provider '{name}' is unavailable: {reason}"),
            None => format!("unknown provider '{name}'"),
        }))
    }

    fn capability<T: ?Sized>(
        &self,
        name: &str,
        capability: &str,
        convert: impl FnOnce(Arc<dyn Plugin>) -> Option<Arc<T>>,
    ) -> Result<Arc<T>> {
        convert(self.get(name)?).ok_or_else(|| {
            ScraperError::InvalidPlugin(format!("provider '{name}' cannot be used as {capability}"))
        })
    }

    pub fn guess(&self, name: &str) -> Result<Arc<dyn GuessProvider>> {
        self.capability(name, "guess provider", Plugin::into_guess)
    }

    pub fn identifier(&self, name: &str) -> Result<Arc<dyn IdentifierProvider>> {
        self.capability(name, "identificator", Plugin::into_identifier)
    }

    pub fn metadata(&self, name: &str) -> Result<Arc<dyn MetadataProvider>> {
        self.capability(name, "metadata provider", Plugin::into_metadata)
    }

    pub fn images(&self, name: &str) -> Result<Arc<dyn ImageProvider>> {
        self.capability(name, "image provider", Plugin::into_images)
    }
}

/// Providers wired up for a run, validated against each other.
pub struct Pipeline {
    pub guess: Vec<Arc<dyn GuessProvider>>,
    identifiers: HashMap<MediaType, Vec<Arc<dyn IdentifierProvider>>>,
    required_ids: HashMap<MediaType, Vec<IdType>>,
    pub resolver: MetadataResolver,
}

impl Pipeline {
    /// Resolve every configured provider name and check that the ids needed
    /// by the metadata and image providers can be found by the identificators.
    pub fn from_settings(
        plugins: &PluginSettings,
        languages: &[String],
        registry: &PluginRegistry,
        cache: ScraperCache,
    ) -> Result<Self> {
        let guess = resolve_all(&plugins.guess, |name| registry.guess(name))?;

        let mut identifiers = HashMap::new();
        for (key, names) in &plugins.identificator {
            let media_type = parse_key::<MediaType>(key, "plugins.identificator")?;
            if !MediaType::GUESSABLE.contains(&media_type) {
                return Err(ScraperError::InvalidConfig(format!(
                    "plugins.identificator.{key}: {media_type} is never identified directly"
                )));
            }
            identifiers.insert(media_type, resolve_all(names, |name| registry.identifier(name))?);
        }

        let metadata = provider_table(&plugins.metadata, "plugins.metadata", |name| {
            registry.metadata(name)
        })?;
        let images = provider_table(&plugins.images, "plugins.images", |name| {
            registry.images(name)
        })?;

        let mut required_ids = HashMap::new();
        for &media_type in MediaType::GUESSABLE {
            let supplied: BTreeSet<IdType> = identifiers
                .get(&media_type)
                .into_iter()
                .flatten()
                .flat_map(|provider: &Arc<dyn IdentifierProvider>| {
                    provider.supplied_ids(media_type).iter().copied()
                })
                .collect();

            let needed = needed_ids(media_type, &metadata, &images);
            if let Some(missing) = needed.iter().find(|id| !supplied.contains(id)) {
                return Err(ScraperError::InvalidConfig(format!(
                    "providers for {media_type} need {missing} ids, \
                     but no identificator configured for {media_type} supplies them"
                )));
            }

            debug!("Required ids for {}: {:?}", media_type, needed);
            required_ids.insert(media_type, needed.into_iter().collect());
        }

        Ok(Self {
            guess,
            identifiers,
            required_ids,
            resolver: MetadataResolver::new(metadata, images, languages.to_vec(), cache),
        })
    }

    pub fn identifiers(&self, media_type: MediaType) -> &[Arc<dyn IdentifierProvider>] {
        self.identifiers
            .get(&media_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Ids that must be resolved before metadata can be fetched
    pub fn required_ids(&self, media_type: MediaType) -> &[IdType] {
        self.required_ids
            .get(&media_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn resolve_all<T: ?Sized>(
    names: &[String],
    resolve: impl Fn(&str) -> Result<Arc<T>>,
) -> Result<Vec<Arc<T>>> {
    names.iter().map(|name| resolve(name)).collect()
}

fn parse_key<K: FromStr<Err = String>>(key: &str, section: &str) -> Result<K> {
    key.parse()
        .map_err(|e| ScraperError::InvalidConfig(format!("{section}.{key}: {e}")))
}

fn provider_table<K, P: ?Sized>(
    settings: &crate::config::ProviderListSettings,
    section: &str,
    resolve: impl Fn(&str) -> Result<Arc<P>>,
) -> Result<ProviderTable<K, P>>
where
    K: FromStr<Err = String> + Hash + Eq,
{
    let mut table = ProviderTable::new(resolve_all(&settings.default, &resolve)?);
    for (key, names) in &settings.overrides {
        let key = parse_key::<K>(key, &format!("{section}.overrides"))?;
        table = table.with_override(key, resolve_all(names, &resolve)?);
    }
    Ok(table)
}

/// Ids the configured metadata and image providers need for a media type
/// and everything resolved alongside it
fn needed_ids(
    media_type: MediaType,
    metadata: &ProviderTable<MetadataField, dyn MetadataProvider>,
    images: &ProviderTable<ImageType, dyn ImageProvider>,
) -> BTreeSet<IdType> {
    let mut needed = BTreeSet::new();

    for &entity in std::iter::once(&media_type).chain(media_type.successors()) {
        let inherited = entity.inherited_fields();
        for &field in entity.metadata_fields() {
            if inherited.iter().any(|(own, _)| *own == field) {
                continue;
            }
            for provider in metadata.providers(&field) {
                if provider.metadata_types().contains(&entity) {
                    needed.extend(provider.metadata_ids(entity).iter().copied());
                }
            }
        }
        for &image_type in entity.image_types() {
            for provider in images.providers(&image_type) {
                if provider.image_types().contains(&entity) {
                    needed.extend(provider.image_ids(entity).iter().copied());
                }
            }
        }
    }

    needed
}
