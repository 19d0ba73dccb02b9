use super::api_types::{
    CachedConfiguration, CastMember, ConfigurationResponse, CrewMember, EpisodeDetails,
    ExternalIds as TmdbExternalIds, FindResponse, MovieDetails, MovieResult, Named,
    SearchResponse, SeasonDetails, TvDetails, TvResult,
};
use crate::config::TmdbSettings;
use crate::scraper::{
    Result, ScraperError,
    cache::{LookupKey, RecordKey, ScraperCache, SearchKey},
    matcher::Disambiguation,
    provider::{HttpClient, IdentifierProvider, ImageProvider, MetadataProvider, Plugin},
    types::{
        Candidate, ExternalIds, Guess, IdType, Identifier, ImageType, MediaType, MetadataField,
        MetadataValue, Person,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const NAME: &str = "tmdb";
const CONFIGURATION_FILE: &str = "tmdb-configuration.json";
const PROFILE_SIZE: &str = "w185";

/// The Movie Database: identifies movies and shows, supplies metadata and
/// posters, backgrounds and episode stills.
pub struct TmdbProvider {
    client: HttpClient,
    api_key: String,
    search_language: String,
    certification_country: String,
    image_base: String,
    poster_size: String,
    background_size: String,
    thumbnail_size: String,
    cache: ScraperCache,
}

impl TmdbProvider {
    /// Fetch (or load the cached) API configuration and build the provider.
    pub async fn connect(settings: &TmdbSettings, cache: ScraperCache) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ScraperError::InvalidConfig("tmdb.api_key is not set".into()))?;
        let client = HttpClient::new(&settings.base_url)?;

        let configuration = Self::load_configuration(&client, &api_key, settings).await?;
        Self::from_configuration(settings, client, api_key, &configuration, cache)
    }

    fn from_configuration(
        settings: &TmdbSettings,
        client: HttpClient,
        api_key: String,
        configuration: &ConfigurationResponse,
        cache: ScraperCache,
    ) -> Result<Self> {
        let images = &configuration.images;
        check_size("poster_size", &settings.poster_size, &images.poster_sizes)?;
        check_size("background_size", &settings.background_size, &images.backdrop_sizes)?;
        check_size("thumbnail_size", &settings.thumbnail_size, &images.still_sizes)?;

        let image_base = if settings.use_https {
            &images.secure_base_url
        } else {
            &images.base_url
        };

        Ok(Self {
            client,
            api_key,
            search_language: settings.search_language.clone(),
            certification_country: settings.certification_country.to_uppercase(),
            image_base: image_base.trim_end_matches('/').to_string(),
            poster_size: settings.poster_size.clone(),
            background_size: settings.background_size.clone(),
            thumbnail_size: settings.thumbnail_size.clone(),
            cache,
        })
    }

    fn configuration_path(settings: &TmdbSettings) -> Option<PathBuf> {
        settings
            .cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("reelsort")))
            .map(|dir| dir.join(CONFIGURATION_FILE))
    }

    async fn load_configuration(
        client: &HttpClient,
        api_key: &str,
        settings: &TmdbSettings,
    ) -> Result<ConfigurationResponse> {
        let path = Self::configuration_path(settings);

        if let Some(path) = &path {
            if let Some(cached) = read_cached(path, settings.cache_validity_days).await {
                debug!("Using cached TMDb configuration from {}", path.display());
                return Ok(cached);
            }
        }

        let configuration: ConfigurationResponse = client
            .get_with_params("/configuration", &[("api_key", api_key)])
            .await?;

        if let Some(path) = &path {
            if let Err(e) = write_cached(path, &configuration).await {
                warn!("Could not cache TMDb configuration: {}", e);
            }
        }

        Ok(configuration)
    }

    fn image_url(&self, path: Option<&str>, size: &str) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|p| format!("{}/{size}{p}", self.image_base))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        extra_params: &[(&str, &str)],
    ) -> Result<T> {
        let mut params: Vec<(&str, &str)> = vec![("api_key", self.api_key.as_str())];
        params.extend_from_slice(extra_params);

        self.client.get_with_params(endpoint, &params).await
    }

    /// Detail record, fetched once per key and run
    async fn record<T: DeserializeOwned>(
        &self,
        key: RecordKey,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let value = self
            .cache
            .records
            .get_or_compute(key, move || async move {
                let value: serde_json::Value = self.request(endpoint, params).await?;
                Ok(Arc::new(value))
            })
            .await?;

        T::deserialize(value.as_ref())
            .map_err(|e| ScraperError::Parse(format!("TMDb {endpoint}: {e}")))
    }

    fn record_key(
        media_type: MediaType,
        id: &str,
        season: Option<u32>,
        episode: Option<u32>,
        language: &str,
    ) -> RecordKey {
        RecordKey {
            provider: NAME.to_string(),
            media_type,
            id: id.to_string(),
            season,
            episode,
            language: Some(language.to_string()),
        }
    }

    async fn movie(&self, id: &str, language: &str) -> Result<MovieDetails> {
        let key = Self::record_key(MediaType::Movie, id, None, None, language);
        self.record(
            key,
            &format!("/movie/{id}"),
            &[
                ("language", language),
                ("append_to_response", "credits,release_dates"),
            ],
        )
        .await
    }

    async fn show(&self, id: &str, language: &str) -> Result<TvDetails> {
        let key = Self::record_key(MediaType::TvShow, id, None, None, language);
        let image_languages = format!("{language},null");
        self.record(
            key,
            &format!("/tv/{id}"),
            &[
                ("language", language),
                ("append_to_response", "credits,content_ratings,images"),
                ("include_image_language", image_languages.as_str()),
            ],
        )
        .await
    }

    async fn season(&self, id: &str, season: u32, language: &str) -> Result<SeasonDetails> {
        let key = Self::record_key(MediaType::Season, id, Some(season), None, language);
        let image_languages = format!("{language},null");
        self.record(
            key,
            &format!("/tv/{id}/season/{season}"),
            &[
                ("language", language),
                ("append_to_response", "images"),
                ("include_image_language", image_languages.as_str()),
            ],
        )
        .await
    }

    async fn episode(
        &self,
        id: &str,
        season: u32,
        episode: u32,
        language: &str,
    ) -> Result<EpisodeDetails> {
        let key = Self::record_key(MediaType::Episode, id, Some(season), Some(episode), language);
        self.record(
            key,
            &format!("/tv/{id}/season/{season}/episode/{episode}"),
            &[("language", language)],
        )
        .await
    }

    async fn search(&self, kind: MediaType, guess: &Guess) -> Result<Vec<Candidate>> {
        let key = SearchKey::new(NAME, kind, &guess.title, guess.year, &self.search_language);

        let candidates = self
            .cache
            .search
            .get_or_compute(key, move || async move {
                let year = guess.year.map(|y| y.to_string());
                let mut params = vec![
                    ("query", guess.title.as_str()),
                    ("language", self.search_language.as_str()),
                ];

                let candidates = if kind == MediaType::Movie {
                    if let Some(year) = &year {
                        params.push(("year", year.as_str()));
                    }
                    let response: SearchResponse<MovieResult> =
                        self.request("/search/movie", &params).await?;
                    response.results.into_iter().map(movie_candidate).collect()
                } else {
                    if let Some(year) = &year {
                        params.push(("first_air_date_year", year.as_str()));
                    }
                    let response: SearchResponse<TvResult> =
                        self.request("/search/tv", &params).await?;
                    response.results.into_iter().map(show_candidate).collect()
                };

                Ok(Arc::new(candidates))
            })
            .await?;

        Ok(candidates.as_ref().clone())
    }

    /// TMDb id for a foreign id, if TMDb knows it
    async fn find(&self, kind: MediaType, external_id: &str, source: &str) -> Result<Option<String>> {
        let key = LookupKey::new(NAME, kind, &format!("{source}:{external_id}"));

        let found = self
            .cache
            .external_ids
            .get_or_compute(key, move || async move {
                let response: FindResponse = self
                    .request(&format!("/find/{external_id}"), &[("external_source", source)])
                    .await?;

                let tmdb = if kind == MediaType::Movie {
                    response.movie_results.first().map(|m| m.id)
                } else {
                    response
                        .tv_results
                        .first()
                        .map(|t| t.id)
                        .or_else(|| response.tv_episode_results.first().map(|e| e.show_id))
                };

                Ok(ExternalIds {
                    tmdb: tmdb.map(|id| id.to_string()),
                    ..ExternalIds::default()
                })
            })
            .await?;

        Ok(found.tmdb)
    }

    async fn lookup_known(&self, kind: MediaType, known: &ExternalIds) -> Result<Option<String>> {
        if let Some(imdb) = known.imdb.as_deref() {
            if let Some(id) = self.find(kind, imdb, "imdb_id").await? {
                return Ok(Some(id));
            }
        }

        if kind == MediaType::TvShow {
            if let Some(tvdb) = known.tvdb.as_deref() {
                return self.find(kind, tvdb, "tvdb_id").await;
            }
        }

        Ok(None)
    }

    /// Back-fill the foreign ids of a TMDb entry
    async fn external_ids(&self, kind: MediaType, tmdb_id: &str) -> Result<ExternalIds> {
        let key = LookupKey::new(NAME, kind, tmdb_id);
        let endpoint = match kind {
            MediaType::Movie => format!("/movie/{tmdb_id}/external_ids"),
            _ => format!("/tv/{tmdb_id}/external_ids"),
        };
        let endpoint = endpoint.as_str();

        self.cache
            .external_ids
            .get_or_compute(key, move || async move {
                let response: TmdbExternalIds = self.request(endpoint, &[]).await?;

                let mut ids = ExternalIds {
                    tmdb: Some(tmdb_id.to_string()),
                    ..ExternalIds::default()
                };
                ids.set(IdType::Imdb, response.imdb_id);
                if kind != MediaType::Movie {
                    ids.set(IdType::Tvdb, response.tvdb_id.map(|id| id.to_string()));
                }
                Ok(ids)
            })
            .await
    }

    fn people(&self, cast: &[CastMember]) -> Option<MetadataValue> {
        let people: Vec<Person> = cast
            .iter()
            .map(|member| {
                Person::new(&member.name)
                    .with_role(member.character.clone().filter(|c| !c.is_empty()))
                    .with_thumb(self.image_url(member.profile_path.as_deref(), PROFILE_SIZE))
                    .with_order(member.order)
            })
            .collect();
        (!people.is_empty()).then_some(MetadataValue::People(people))
    }

    fn movie_field(&self, movie: &MovieDetails, field: MetadataField) -> Option<MetadataValue> {
        let credits = movie.credits.as_ref();
        match field {
            MetadataField::Title => text(movie.title.as_deref()),
            MetadataField::OriginalTitle => text(movie.original_title.as_deref()),
            MetadataField::Premiered => text(movie.release_date.as_deref()),
            MetadataField::Tagline => text(movie.tagline.as_deref()),
            MetadataField::Plot => text(movie.overview.as_deref()),
            MetadataField::Set => text(
                movie
                    .belongs_to_collection
                    .as_ref()
                    .and_then(|c| c.name.as_deref()),
            ),
            MetadataField::Certification => movie
                .release_dates
                .as_ref()
                .and_then(|r| {
                    r.results
                        .iter()
                        .find(|c| c.iso_3166_1 == self.certification_country)
                })
                .and_then(|c| {
                    c.release_dates
                        .iter()
                        .map(|d| d.certification.as_str())
                        .find(|cert| !cert.trim().is_empty())
                })
                .and_then(|cert| text(Some(cert))),
            MetadataField::Rating => movie.vote_average.map(MetadataValue::Number),
            MetadataField::Votes => movie.vote_count.map(MetadataValue::Count),
            MetadataField::Studios => names(&movie.production_companies),
            MetadataField::Countries => names(&movie.production_countries),
            MetadataField::Genres => names(&movie.genres),
            MetadataField::Directors => crew(credits.map(|c| c.crew.as_slice()), &["Director"]),
            MetadataField::Writers => crew(
                credits.map(|c| c.crew.as_slice()),
                &["Writer", "Screenplay"],
            ),
            MetadataField::Actors => credits.and_then(|c| self.people(&c.cast)),
            _ => None,
        }
    }

    fn show_field(&self, show: &TvDetails, field: MetadataField) -> Option<MetadataValue> {
        match field {
            MetadataField::Title => text(show.name.as_deref()),
            MetadataField::OriginalTitle => text(show.original_name.as_deref()),
            MetadataField::Premiered => text(show.first_air_date.as_deref()),
            MetadataField::Plot => text(show.overview.as_deref()),
            MetadataField::Certification => show
                .content_ratings
                .as_ref()
                .and_then(|r| {
                    r.results
                        .iter()
                        .find(|c| c.iso_3166_1 == self.certification_country)
                })
                .and_then(|c| text(Some(c.rating.as_str()))),
            MetadataField::Rating => show.vote_average.map(MetadataValue::Number),
            MetadataField::Votes => show.vote_count.map(MetadataValue::Count),
            MetadataField::Creators => names(&show.created_by),
            MetadataField::Studios => names(&show.production_companies),
            MetadataField::Networks => names(&show.networks),
            MetadataField::Genres => names(&show.genres),
            MetadataField::Actors => show.credits.as_ref().and_then(|c| self.people(&c.cast)),
            _ => None,
        }
    }

    fn season_field(season: &SeasonDetails, field: MetadataField) -> Option<MetadataValue> {
        match field {
            MetadataField::Title => text(season.name.as_deref()),
            MetadataField::Premiered => text(season.air_date.as_deref()),
            MetadataField::Plot => text(season.overview.as_deref()),
            _ => None,
        }
    }

    fn episode_field(episode: &EpisodeDetails, field: MetadataField) -> Option<MetadataValue> {
        match field {
            MetadataField::Title => text(episode.name.as_deref()),
            MetadataField::Premiered => text(episode.air_date.as_deref()),
            MetadataField::Plot => text(episode.overview.as_deref()),
            MetadataField::Rating => episode.vote_average.map(MetadataValue::Number),
            MetadataField::Votes => episode.vote_count.map(MetadataValue::Count),
            MetadataField::Directors => crew(Some(episode.crew.as_slice()), &["Director"]),
            MetadataField::Writers => crew(Some(episode.crew.as_slice()), &["Writer", "Screenplay"]),
            _ => None,
        }
    }

    /// Show cast followed by the episode's guest stars
    async fn episode_actors(
        &self,
        id: &str,
        episode: &EpisodeDetails,
        language: &str,
    ) -> Result<Option<MetadataValue>> {
        let show = self.show(id, language).await?;
        let guests = episode
            .guest_stars
            .iter()
            .filter(|guest| guest.character.as_deref().is_some_and(|c| !c.is_empty()));

        let cast: Vec<&CastMember> = show
            .credits
            .iter()
            .flat_map(|c| c.cast.iter())
            .chain(guests)
            .collect();

        let people: Vec<Person> = cast
            .into_iter()
            .map(|member| {
                Person::new(&member.name)
                    .with_role(member.character.clone().filter(|c| !c.is_empty()))
                    .with_thumb(self.image_url(member.profile_path.as_deref(), PROFILE_SIZE))
            })
            .collect();

        Ok((!people.is_empty()).then_some(MetadataValue::People(people)))
    }
}

fn check_size(setting: &str, size: &str, available: &[String]) -> Result<()> {
    if available.iter().any(|s| s == size) {
        Ok(())
    } else {
        Err(ScraperError::InvalidConfig(format!(
            "tmdb.{setting} '{size}' is not one of: {}",
            available.join(", ")
        )))
    }
}

async fn read_cached(path: &Path, validity_days: u32) -> Option<ConfigurationResponse> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    let cached: CachedConfiguration = match serde_json::from_str(&content) {
        Ok(cached) => cached,
        Err(e) => {
            debug!("Ignoring unreadable {}: {}", path.display(), e);
            return None;
        }
    };

    let age = Utc::now() - cached.fetched;
    (age < chrono::Duration::days(i64::from(validity_days))).then_some(cached.configuration)
}

async fn write_cached(path: &Path, configuration: &ConfigurationResponse) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let cached = CachedConfiguration {
        fetched: Utc::now(),
        configuration: configuration.clone(),
    };
    let content =
        serde_json::to_string_pretty(&cached).map_err(|e| ScraperError::Parse(e.to_string()))?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

fn text(value: Option<&str>) -> Option<MetadataValue> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(MetadataValue::from)
}

fn names(items: &[Named]) -> Option<MetadataValue> {
    let names: Vec<String> = items
        .iter()
        .map(|item| item.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    (!names.is_empty()).then_some(MetadataValue::List(names))
}

fn crew(crew: Option<&[CrewMember]>, jobs: &[&str]) -> Option<MetadataValue> {
    let mut names: Vec<String> = Vec::new();
    for member in crew.unwrap_or_default() {
        if member.job.as_deref().is_some_and(|job| jobs.contains(&job))
            && !names.contains(&member.name)
        {
            names.push(member.name.clone());
        }
    }
    (!names.is_empty()).then_some(MetadataValue::List(names))
}

fn year_of(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.split('-').next())
        .and_then(|y| y.parse().ok())
}

fn movie_candidate(movie: MovieResult) -> Candidate {
    Candidate::new(movie.id.to_string(), movie.title, NAME)
        .with_type(MediaType::Movie)
        .with_year(year_of(movie.release_date.as_deref()))
        .with_original_title(movie.original_title)
        .with_overview(movie.overview)
}

fn show_candidate(show: TvResult) -> Candidate {
    Candidate::new(show.id.to_string(), show.name, NAME)
        .with_type(MediaType::TvShow)
        .with_year(year_of(show.first_air_date.as_deref()))
        .with_original_title(show.original_name)
        .with_overview(show.overview)
}

/// Catalog entry type searched for a guessed media type
fn catalog_type(media_type: MediaType) -> Result<MediaType> {
    match media_type {
        MediaType::Movie => Ok(MediaType::Movie),
        MediaType::Episode => Ok(MediaType::TvShow),
        other => Err(ScraperError::InvalidMediaType(other)),
    }
}

fn season_of(identifier: &Identifier) -> Result<u32> {
    identifier
        .season
        .ok_or_else(|| ScraperError::NotEnoughData(format!("{identifier} has no season")))
}

fn episode_of(identifier: &Identifier) -> Result<(u32, u32)> {
    let season = season_of(identifier)?;
    let episode = identifier
        .episode
        .ok_or_else(|| ScraperError::NotEnoughData(format!("{identifier} has no episode")))?;
    Ok((season, episode))
}

impl Plugin for TmdbProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn into_identifier(self: Arc<Self>) -> Option<Arc<dyn IdentifierProvider>> {
        Some(self)
    }

    fn into_metadata(self: Arc<Self>) -> Option<Arc<dyn MetadataProvider>> {
        Some(self)
    }

    fn into_images(self: Arc<Self>) -> Option<Arc<dyn ImageProvider>> {
        Some(self)
    }
}

#[async_trait]
impl IdentifierProvider for TmdbProvider {
    fn supplied_ids(&self, media_type: MediaType) -> &'static [IdType] {
        match media_type {
            MediaType::Movie => &[IdType::Tmdb, IdType::Imdb],
            MediaType::TvShow | MediaType::Episode => &[IdType::Tmdb, IdType::Imdb, IdType::Tvdb],
            MediaType::Season => &[],
        }
    }

    async fn identify(
        &self,
        guess: &Guess,
        current: &Identifier,
        disambiguation: &Disambiguation,
    ) -> Result<Option<ExternalIds>> {
        let kind = catalog_type(guess.media_type)?;

        let mut known = current.ids.clone();
        known.fill_from(&guess.ids);

        let tmdb_id = match known.tmdb.clone() {
            Some(id) => Some(id),
            None => self.lookup_known(kind, &known).await?,
        };

        let tmdb_id = match tmdb_id {
            Some(id) => id,
            None => {
                let candidates = self.search(kind, guess).await?;
                match disambiguation.choose(&guess.query(), candidates, guess.media_type)? {
                    Some(candidate) => candidate.id,
                    None => {
                        debug!("TMDb has no match for '{}'", guess.query());
                        return Ok(None);
                    }
                }
            }
        };

        self.external_ids(kind, &tmdb_id).await.map(Some)
    }
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn metadata_types(&self) -> &'static [MediaType] {
        &[
            MediaType::Movie,
            MediaType::TvShow,
            MediaType::Season,
            MediaType::Episode,
        ]
    }

    fn metadata_ids(&self, _media_type: MediaType) -> &'static [IdType] {
        &[IdType::Tmdb]
    }

    async fn metadata(
        &self,
        identifier: &Identifier,
        field: MetadataField,
        language: &str,
    ) -> Result<Option<MetadataValue>> {
        let Some(id) = identifier.ids.tmdb.as_deref() else {
            return Ok(None);
        };

        match identifier.media_type {
            MediaType::Movie => {
                let movie = self.movie(id, language).await?;
                Ok(self.movie_field(&movie, field))
            }
            MediaType::TvShow => {
                let show = self.show(id, language).await?;
                Ok(self.show_field(&show, field))
            }
            MediaType::Season => {
                let season = self.season(id, season_of(identifier)?, language).await?;
                Ok(Self::season_field(&season, field))
            }
            MediaType::Episode => {
                let (season, number) = episode_of(identifier)?;
                let episode = self.episode(id, season, number, language).await?;
                if field == MetadataField::Actors {
                    self.episode_actors(id, &episode, language).await
                } else {
                    Ok(Self::episode_field(&episode, field))
                }
            }
        }
    }
}

#[async_trait]
impl ImageProvider for TmdbProvider {
    fn image_types(&self) -> &'static [MediaType] {
        &[
            MediaType::Movie,
            MediaType::TvShow,
            MediaType::Season,
            MediaType::Episode,
        ]
    }

    fn image_ids(&self, _media_type: MediaType) -> &'static [IdType] {
        &[IdType::Tmdb]
    }

    async fn image(
        &self,
        identifier: &Identifier,
        image_type: ImageType,
        language: &str,
    ) -> Result<Option<String>> {
        let Some(id) = identifier.ids.tmdb.as_deref() else {
            return Ok(None);
        };

        let url = match (identifier.media_type, image_type) {
            (MediaType::Movie, ImageType::Poster) => {
                let movie = self.movie(id, language).await?;
                self.image_url(movie.poster_path.as_deref(), &self.poster_size)
            }
            (MediaType::Movie, ImageType::Background) => {
                let movie = self.movie(id, language).await?;
                self.image_url(movie.backdrop_path.as_deref(), &self.background_size)
            }
            (MediaType::TvShow, ImageType::Poster) => {
                let show = self.show(id, language).await?;
                let path = show
                    .images
                    .as_ref()
                    .and_then(|i| i.posters.first())
                    .map(|p| p.file_path.as_str())
                    .or(show.poster_path.as_deref());
                self.image_url(path, &self.poster_size)
            }
            (MediaType::TvShow, ImageType::Background) => {
                let show = self.show(id, language).await?;
                let path = show
                    .images
                    .as_ref()
                    .and_then(|i| i.backdrops.first())
                    .map(|p| p.file_path.as_str())
                    .or(show.backdrop_path.as_deref());
                self.image_url(path, &self.background_size)
            }
            (MediaType::Season, ImageType::Poster) => {
                let season = self.season(id, season_of(identifier)?, language).await?;
                let path = season
                    .images
                    .as_ref()
                    .and_then(|i| i.posters.first())
                    .map(|p| p.file_path.as_str())
                    .or(season.poster_path.as_deref());
                self.image_url(path, &self.poster_size)
            }
            (MediaType::Episode, ImageType::Thumbnail) => {
                let (season, number) = episode_of(identifier)?;
                let episode = self.episode(id, season, number, language).await?;
                self.image_url(episode.still_path.as_deref(), &self.thumbnail_size)
            }
            _ => None,
        };

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::types::PartialGuess;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn configuration() -> serde_json::Value {
        json!({
            "images": {
                "base_url": "http://image.tmdb.org/t/p/",
                "secure_base_url": "https://image.tmdb.org/t/p/",
                "poster_sizes": ["w342", "w500", "original"],
                "backdrop_sizes": ["w780", "w1280", "original"],
                "still_sizes": ["w185", "w300", "original"]
            }
        })
    }

    fn settings(server: &MockServer, cache_dir: &Path) -> TmdbSettings {
        TmdbSettings {
            api_key: Some("key".to_string()),
            base_url: server.uri(),
            cache_dir: Some(cache_dir.to_path_buf()),
            ..TmdbSettings::default()
        }
    }

    async fn mount_configuration(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/configuration"))
            .and(query_param("api_key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(configuration()))
            .mount(server)
            .await;
    }

    async fn provider(server: &MockServer, cache_dir: &Path) -> TmdbProvider {
        mount_configuration(server).await;
        TmdbProvider::connect(&settings(server, cache_dir), ScraperCache::new())
            .await
            .unwrap()
    }

    fn movie_guess() -> Guess {
        Guess::finalize(
            Path::new("/incoming/The.Matrix.1999.mkv"),
            PartialGuess::new()
                .with_type(MediaType::Movie)
                .with_title("The Matrix")
                .with_year(1999),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_configuration_is_cached_on_disk() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(configuration()))
            .expect(1)
            .mount(&server)
            .await;

        let settings = settings(&server, dir.path());
        TmdbProvider::connect(&settings, ScraperCache::new())
            .await
            .unwrap();
        let provider = TmdbProvider::connect(&settings, ScraperCache::new())
            .await
            .unwrap();

        assert!(dir.path().join(CONFIGURATION_FILE).exists());
        assert_eq!(provider.image_base, "https://image.tmdb.org/t/p");
    }

    #[tokio::test]
    async fn test_unknown_image_size_is_config_error() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mount_configuration(&server).await;

        let settings = TmdbSettings {
            poster_size: "w9999".to_string(),
            ..settings(&server, dir.path())
        };
        let result = TmdbProvider::connect(&settings, ScraperCache::new()).await;

        assert!(matches!(result, Err(ScraperError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let result = TmdbProvider::connect(&TmdbSettings::default(), ScraperCache::new()).await;
        assert!(matches!(result, Err(ScraperError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_identify_movie_by_search() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = provider(&server, dir.path()).await;

        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("query", "The Matrix"))
            .and(query_param("year", "1999"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": 624860, "title": "The Matrix Resurrections", "release_date": "2021-12-16"},
                    {"id": 603, "title": "The Matrix", "release_date": "1999-03-31"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/603/external_ids"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"imdb_id": "tt0133093"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let guess = movie_guess();
        let seed = Identifier::seed(&guess);
        for _ in 0..2 {
            let ids = provider
                .identify(&guess, &seed, &Disambiguation::BestMatch)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(ids.tmdb.as_deref(), Some("603"));
            assert_eq!(ids.imdb.as_deref(), Some("tt0133093"));
            assert_eq!(ids.tvdb, None);
        }
    }

    #[tokio::test]
    async fn test_identify_by_known_imdb_id() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = provider(&server, dir.path()).await;

        Mock::given(method("GET"))
            .and(path("/find/tt0944947"))
            .and(query_param("external_source", "imdb_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "movie_results": [],
                "tv_results": [{"id": 1399, "name": "Game of Thrones"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/1399/external_ids"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"imdb_id": "tt0944947", "tvdb_id": 121361}),
            ))
            .mount(&server)
            .await;

        let guess = Guess::finalize(
            Path::new("/incoming/got.s01e01.mkv"),
            PartialGuess::new()
                .with_type(MediaType::Episode)
                .with_title("got")
                .with_episode(1, 1),
        )
        .unwrap();
        let mut current = Identifier::seed(&guess);
        current.ids.imdb = Some("tt0944947".to_string());

        let ids = provider
            .identify(&guess, &current, &Disambiguation::BestMatch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(ids.tmdb.as_deref(), Some("1399"));
        assert_eq!(ids.tvdb.as_deref(), Some("121361"));
    }

    #[tokio::test]
    async fn test_no_search_results() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = provider(&server, dir.path()).await;

        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let guess = movie_guess();
        let ids = provider
            .identify(&guess, &Identifier::seed(&guess), &Disambiguation::BestMatch)
            .await
            .unwrap();
        assert!(ids.is_none());
    }

    #[tokio::test]
    async fn test_movie_metadata_and_images() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = provider(&server, dir.path()).await;

        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .and(query_param("append_to_response", "credits,release_dates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "The Matrix",
                "original_title": "The Matrix",
                "release_date": "1999-03-31",
                "tagline": "",
                "poster_path": "/poster.jpg",
                "vote_average": 8.2,
                "vote_count": 24000,
                "belongs_to_collection": {"name": "The Matrix Collection"},
                "genres": [{"name": "Action"}, {"name": "Science Fiction"}],
                "credits": {
                    "cast": [{"name": "Keanu Reeves", "character": "Neo", "order": 0}],
                    "crew": [
                        {"name": "Lana Wachowski", "job": "Director"},
                        {"name": "Lana Wachowski", "job": "Writer"},
                        {"name": "Lilly Wachowski", "job": "Director"}
                    ]
                },
                "release_dates": {"results": [
                    {"iso_3166_1": "DE", "release_dates": [{"certification": "16"}]},
                    {"iso_3166_1": "US", "release_dates": [{"certification": ""}, {"certification": "R"}]}
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let identifier = Identifier::new(
            MediaType::Movie,
            ExternalIds {
                tmdb: Some("603".to_string()),
                ..ExternalIds::default()
            },
        );

        let get = |field| provider.metadata(&identifier, field, "en");
        assert_eq!(
            get(MetadataField::Title).await.unwrap(),
            Some(MetadataValue::from("The Matrix"))
        );
        assert_eq!(get(MetadataField::Tagline).await.unwrap(), None);
        assert_eq!(
            get(MetadataField::Certification).await.unwrap(),
            Some(MetadataValue::from("R"))
        );
        assert_eq!(
            get(MetadataField::Set).await.unwrap(),
            Some(MetadataValue::from("The Matrix Collection"))
        );
        assert_eq!(
            get(MetadataField::Directors).await.unwrap(),
            Some(MetadataValue::List(vec![
                "Lana Wachowski".to_string(),
                "Lilly Wachowski".to_string()
            ]))
        );
        let actors = get(MetadataField::Actors).await.unwrap().unwrap();
        assert_eq!(actors.as_people().unwrap()[0].role.as_deref(), Some("Neo"));

        let poster = provider
            .image(&identifier, ImageType::Poster, "en")
            .await
            .unwrap();
        assert_eq!(
            poster.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/poster.jpg")
        );
        let logo = provider
            .image(&identifier, ImageType::Logo, "en")
            .await
            .unwrap();
        assert_eq!(logo, None);
    }

    #[tokio::test]
    async fn test_episode_actors_include_guest_stars() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = provider(&server, dir.path()).await;

        Mock::given(method("GET"))
            .and(path("/tv/1399"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Game of Thrones",
                "credits": {"cast": [{"name": "Emilia Clarke", "character": "Daenerys Targaryen"}], "crew": []}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/1399/season/2/episode/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "The Ghost of Harrenhal",
                "still_path": "/still.jpg",
                "guest_stars": [
                    {"name": "Guest Actor", "character": "Knight"},
                    {"name": "Uncredited", "character": ""}
                ],
                "crew": [{"name": "David Petrarca", "job": "Director"}]
            })))
            .mount(&server)
            .await;

        let identifier = Identifier::new(
            MediaType::Episode,
            ExternalIds {
                tmdb: Some("1399".to_string()),
                ..ExternalIds::default()
            },
        )
        .with_season(2)
        .with_episode(5);

        let actors = provider
            .metadata(&identifier, MetadataField::Actors, "en")
            .await
            .unwrap()
            .unwrap();
        let names: Vec<&str> = actors
            .as_people()
            .unwrap()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Emilia Clarke", "Guest Actor"]);

        let thumb = provider
            .image(&identifier, ImageType::Thumbnail, "en")
            .await
            .unwrap();
        assert_eq!(
            thumb.as_deref(),
            Some("https://image.tmdb.org/t/p/w300/still.jpg")
        );
    }
}
