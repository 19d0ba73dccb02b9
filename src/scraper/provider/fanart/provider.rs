use super::api_types::FanartImage;
use crate::config::FanartSettings;
use crate::scraper::{
    Result, ScraperError,
    cache::{ArtworkKey, ScraperCache},
    provider::{HttpClient, ImageProvider, Plugin},
    types::{IdType, Identifier, ImageType, MediaType},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const NAME: &str = "fanarttv";
/// Language tag of text-free artwork
const NEUTRAL_LANGUAGE: &str = "00";

/// fanart.tv artwork for movies (by TMDb id) and shows (by TVDB id)
pub struct FanartProvider {
    client: HttpClient,
    api_key: String,
    cache: ScraperCache,
}

impl FanartProvider {
    pub fn new(settings: &FanartSettings, cache: ScraperCache) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ScraperError::InvalidConfig("fanarttv.api_key is not set".into()))?;

        Ok(Self {
            client: HttpClient::new(&settings.base_url)?,
            api_key,
            cache,
        })
    }

    /// Document categories to try for an image type, best first
    const fn categories(media_type: MediaType, image_type: ImageType) -> &'static [&'static str] {
        match (media_type, image_type) {
            (MediaType::Movie, ImageType::Logo) => &["hdmovielogo", "movielogo"],
            (MediaType::Movie, ImageType::Disc) => &["moviedisc"],
            (MediaType::Movie, ImageType::Poster) => &["movieposter"],
            (MediaType::Movie, ImageType::ClearArt) => &["hdmovieclearart", "movieart"],
            (MediaType::Movie, ImageType::Background) => &["moviebackground"],
            (MediaType::Movie, ImageType::Banner) => &["moviebanner"],
            (MediaType::Movie, ImageType::Art) => &["moviethumb"],
            (MediaType::TvShow, ImageType::Logo) => &["hdtvlogo", "tvlogo"],
            (MediaType::TvShow, ImageType::Poster) => &["tvposter"],
            (MediaType::TvShow, ImageType::CharArt) => &["characterart"],
            (MediaType::TvShow, ImageType::ClearArt) => &["hdclearart", "clearart"],
            (MediaType::TvShow, ImageType::Background) => &["showbackground"],
            (MediaType::TvShow, ImageType::Banner) => &["tvbanner"],
            (MediaType::TvShow, ImageType::Art) => &["tvthumb"],
            _ => &[],
        }
    }

    /// Artwork document for an entry; `Null` when fanart.tv has none or
    /// cannot be reached, remembered for the rest of the run
    async fn document(&self, media_type: MediaType, id: &str) -> Result<Arc<serde_json::Value>> {
        let category = if media_type == MediaType::Movie {
            "movies"
        } else {
            "tv"
        };
        let key = ArtworkKey {
            provider: NAME.to_string(),
            category: category.to_string(),
            id: id.to_string(),
        };

        self.cache
            .artwork
            .get_or_compute(key, move || async move {
                let document: Option<serde_json::Value> = match self
                    .client
                    .get_optional(
                        &format!("/{category}/{id}"),
                        &[("api_key", self.api_key.as_str())],
                    )
                    .await
                {
                    Ok(document) => document,
                    Err(e) => {
                        warn!("fanart.tv lookup for {}/{} failed: {}", category, id, e);
                        None
                    }
                };
                Ok(Arc::new(document.unwrap_or_default()))
            })
            .await
    }
}

impl Plugin for FanartProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn into_images(self: Arc<Self>) -> Option<Arc<dyn ImageProvider>> {
        Some(self)
    }
}

#[async_trait]
impl ImageProvider for FanartProvider {
    fn image_types(&self) -> &'static [MediaType] {
        &[MediaType::Movie, MediaType::TvShow]
    }

    fn image_ids(&self, media_type: MediaType) -> &'static [IdType] {
        match media_type {
            MediaType::Movie => &[IdType::Tmdb],
            MediaType::TvShow => &[IdType::Tvdb],
            _ => &[],
        }
    }

    async fn image(
        &self,
        identifier: &Identifier,
        image_type: ImageType,
        language: &str,
    ) -> Result<Option<String>> {
        let categories = Self::categories(identifier.media_type, image_type);
        let id = match identifier.media_type {
            MediaType::Movie => identifier.ids.tmdb.as_deref(),
            MediaType::TvShow => identifier.ids.tvdb.as_deref(),
            _ => None,
        };
        let Some(id) = id.filter(|_| !categories.is_empty()) else {
            return Ok(None);
        };

        let document = self.document(identifier.media_type, id).await?;

        for category in categories {
            let Some(entries) = document.get(*category) else {
                continue;
            };
            let images: Vec<FanartImage> = match serde_json::from_value(entries.clone()) {
                Ok(images) => images,
                Err(e) => {
                    debug!("Skipping malformed fanart.tv '{}' list: {}", category, e);
                    continue;
                }
            };

            if let Some(image) = images
                .into_iter()
                .find(|image| image.lang == language || image.lang == NEUTRAL_LANGUAGE)
            {
                return Ok(Some(image.url));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::types::ExternalIds;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> FanartProvider {
        let settings = FanartSettings {
            api_key: Some("key".to_string()),
            base_url: server.uri(),
        };
        FanartProvider::new(&settings, ScraperCache::new()).unwrap()
    }

    fn movie(tmdb: &str) -> Identifier {
        Identifier::new(
            MediaType::Movie,
            ExternalIds {
                tmdb: Some(tmdb.to_string()),
                ..ExternalIds::default()
            },
        )
    }

    #[tokio::test]
    async fn test_movie_images_by_language() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies/603"))
            .and(query_param("api_key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "The Matrix",
                "movielogo": [
                    {"id": "1", "url": "https://assets/logo-fr.png", "lang": "fr"},
                    {"id": "2", "url": "https://assets/logo-en.png", "lang": "en"}
                ],
                "moviedisc": [
                    {"id": "3", "url": "https://assets/disc.png", "lang": "00"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server);
        let identifier = movie("603");

        let logo = provider
            .image(&identifier, ImageType::Logo, "en")
            .await
            .unwrap();
        assert_eq!(logo.as_deref(), Some("https://assets/logo-en.png"));

        let disc = provider
            .image(&identifier, ImageType::Disc, "de")
            .await
            .unwrap();
        assert_eq!(disc.as_deref(), Some("https://assets/disc.png"));

        let banner = provider
            .image(&identifier, ImageType::Banner, "en")
            .await
            .unwrap();
        assert_eq!(banner, None);
    }

    #[tokio::test]
    async fn test_unknown_entry_has_no_images() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies/1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let image = provider(&server)
            .image(&movie("1"), ImageType::Poster, "en")
            .await
            .unwrap();
        assert_eq!(image, None);
    }

    #[tokio::test]
    async fn test_server_error_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies/603"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server);
        let identifier = movie("603");
        for (image_type, language) in [
            (ImageType::Poster, "en"),
            (ImageType::Logo, "en"),
            (ImageType::Poster, "de"),
        ] {
            let image = provider
                .image(&identifier, image_type, language)
                .await
                .unwrap();
            assert_eq!(image, None);
        }
    }

    #[tokio::test]
    async fn test_show_uses_tvdb_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/121361"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "characterart": [{"id": "9", "url": "https://assets/char.png", "lang": "en"}]
            })))
            .mount(&server)
            .await;

        let show = Identifier::new(
            MediaType::TvShow,
            ExternalIds {
                tmdb: Some("1399".to_string()),
                tvdb: Some("121361".to_string()),
                ..ExternalIds::default()
            },
        );
        let image = provider(&server)
            .image(&show, ImageType::CharArt, "en")
            .await
            .unwrap();
        assert_eq!(image.as_deref(), Some("https://assets/char.png"));

        let season = show.successor(MediaType::Season);
        let none = provider(&server)
            .image(&season, ImageType::Poster, "en")
            .await
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_requires_api_key() {
        let result = FanartProvider::new(&FanartSettings::default(), ScraperCache::new());
        assert!(matches!(result, Err(ScraperError::InvalidConfig(_))));
    }
}
