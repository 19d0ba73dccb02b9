//! Runtime settings.
//!
//! Loaded from built-in defaults, an optional TOML file and `REELSORT__SECTION__KEY`
//! environment overrides, in that order.

use crate::scraper::{Result, ScraperError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use validator::Validate;

const ENV_PREFIX: &str = "REELSORT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub general: GeneralSettings,
    pub overwrite: OverwriteSettings,
    #[validate(nested)]
    pub videofiles: VideoFileSettings,
    #[validate(nested)]
    pub plugins: PluginSettings,
    #[validate(nested)]
    pub tmdb: TmdbSettings,
    #[validate(nested)]
    pub fanarttv: FanartSettings,
    pub paths: PathSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GeneralSettings {
    /// Metadata languages in priority order
    #[validate(length(min = 1))]
    pub languages: Vec<String>,
    /// move, copy, hardlink or symlink
    #[validate(length(min = 1))]
    pub organize_method: String,
    /// Log every action without touching the filesystem
    pub dry_run: bool,
    /// Directory for a daily rolling log file
    pub log_dir: Option<PathBuf>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            organize_method: "move".to_string(),
            dry_run: false,
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverwriteSettings {
    pub media: bool,
    pub nfo: bool,
    pub images: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VideoFileSettings {
    #[validate(length(min = 1))]
    pub allowed_extensions: Vec<String>,
    /// Minimal size in MiB
    pub minimal_file_size: u64,
}

impl Default for VideoFileSettings {
    fn default() -> Self {
        Self {
            allowed_extensions: ["mkv", "avi", "mp4", "m4v"]
                .into_iter()
                .map(String::from)
                .collect(),
            minimal_file_size: 100,
        }
    }
}

/// Provider names per capability, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PluginSettings {
    #[validate(length(min = 1))]
    pub guess: Vec<String>,
    /// Identifier providers keyed by media type (movie, episode)
    pub identificator: BTreeMap<String, Vec<String>>,
    pub metadata: ProviderListSettings,
    pub images: ProviderListSettings,
}

impl Default for PluginSettings {
    fn default() -> Self {
        let identificators = vec!["nfo".to_string(), "tmdb".to_string()];
        Self {
            guess: vec!["nfo".to_string(), "filename".to_string()],
            identificator: BTreeMap::from([
                ("movie".to_string(), identificators.clone()),
                ("episode".to_string(), identificators),
            ]),
            metadata: ProviderListSettings {
                default: vec!["tmdb".to_string()],
                overrides: BTreeMap::new(),
            },
            images: ProviderListSettings {
                default: vec!["tmdb".to_string()],
                overrides: BTreeMap::new(),
            },
        }
    }
}

/// A default provider list plus per-key overrides (field or image type names)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderListSettings {
    pub default: Vec<String>,
    pub overrides: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TmdbSettings {
    pub api_key: Option<String>,
    #[validate(length(min = 1))]
    pub base_url: String,
    #[validate(length(min = 2))]
    pub search_language: String,
    #[validate(length(equal = 2))]
    pub certification_country: String,
    pub use_https: bool,
    pub poster_size: String,
    pub background_size: String,
    pub thumbnail_size: String,
    /// Days the cached TMDb configuration stays valid
    #[validate(range(min = 1))]
    pub cache_validity_days: u32,
    /// Where the TMDb configuration is cached; defaults to the user cache dir
    pub cache_dir: Option<PathBuf>,
}

impl Default for TmdbSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.themoviedb.org/3".to_string(),
            search_language: "en".to_string(),
            certification_country: "US".to_string(),
            use_https: true,
            poster_size: "w500".to_string(),
            background_size: "w1280".to_string(),
            thumbnail_size: "w300".to_string(),
            cache_validity_days: 7,
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FanartSettings {
    pub api_key: Option<String>,
    #[validate(length(min = 1))]
    pub base_url: String,
}

impl Default for FanartSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "http://webservice.fanart.tv/v3".to_string(),
        }
    }
}

/// Output layout per media type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub movie: MediaPathSettings,
    pub tvshow: MediaPathSettings,
    pub season: MediaPathSettings,
    pub episode: MediaPathSettings,
}

/// Templates are relative to `base`; image templates omit the extension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaPathSettings {
    pub base: PathBuf,
    pub media: Option<String>,
    pub nfo: Option<String>,
    pub images: BTreeMap<String, String>,
}

impl Default for PathSettings {
    fn default() -> Self {
        let videos = dirs::video_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let movies = videos.join("Movies");
        let shows = videos.join("TV Shows");

        let movie_dir = "{title} ({year})";
        let images = |dir: &str, names: &[(&str, &str)]| -> BTreeMap<String, String> {
            names
                .iter()
                .map(|(kind, file)| (kind.to_string(), format!("{dir}/{file}")))
                .collect()
        };

        let episode_stem =
            "{show_title}/Season {season:02}/{show_title} - S{season:02}E{episode:02} - {title}";

        Self {
            movie: MediaPathSettings {
                base: movies,
                media: Some(format!("{movie_dir}/{movie_dir}.{{ext}}")),
                nfo: Some(format!("{movie_dir}/{movie_dir}.nfo")),
                images: images(
                    movie_dir,
                    &[
                        ("poster", "poster"),
                        ("background", "fanart"),
                        ("logo", "logo"),
                        ("disc", "disc"),
                        ("art", "landscape"),
                        ("clearart", "clearart"),
                        ("banner", "banner"),
                    ],
                ),
            },
            tvshow: MediaPathSettings {
                base: shows.clone(),
                media: None,
                nfo: Some("{title}/tvshow.nfo".to_string()),
                images: images(
                    "{title}",
                    &[
                        ("poster", "poster"),
                        ("background", "fanart"),
                        ("logo", "logo"),
                        ("art", "landscape"),
                        ("clearart", "clearart"),
                        ("banner", "banner"),
                        ("charart", "character"),
                    ],
                ),
            },
            season: MediaPathSettings {
                base: shows.clone(),
                media: None,
                nfo: None,
                images: images("{show_title}", &[("poster", "season{season:02}-poster")]),
            },
            episode: MediaPathSettings {
                base: shows,
                media: Some(format!("{episode_stem}.{{ext}}")),
                nfo: Some(format!("{episode_stem}.nfo")),
                images: BTreeMap::from([(
                    "thumbnail".to_string(),
                    format!("{episode_stem}-thumb"),
                )]),
            },
        }
    }
}

impl PathSettings {
    pub fn for_type(&self, media_type: crate::scraper::MediaType) -> &MediaPathSettings {
        use crate::scraper::MediaType;
        match media_type {
            MediaType::Movie => &self.movie,
            MediaType::TvShow => &self.tvshow,
            MediaType::Season => &self.season,
            MediaType::Episode => &self.episode,
        }
    }
}

impl Settings {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reelsort").join("config.toml"))
    }

    /// Load settings. An explicitly given file must exist; the default file
    /// is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(
                    config::File::from(path)
                        .format(config::FileFormat::Toml)
                        .required(true),
                );
            }
            None => {
                if let Some(default) = Self::default_path() {
                    builder = builder.add_source(
                        config::File::from(default)
                            .format(config::FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("general.languages")
                .with_list_parse_key("videofiles.allowed_extensions")
                .with_list_parse_key("plugins.guess")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ScraperError::InvalidConfig(e.to_string()))?;

        settings.validate_all()?;
        Ok(settings)
    }

    /// Field-level validation
    pub fn validate_all(&self) -> Result<()> {
        self.validate()
            .map_err(|e| ScraperError::InvalidConfig(e.to_string()))
    }

    /// Effective settings as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ScraperError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate_all().is_ok());
        assert_eq!(settings.general.languages, vec!["en".to_string()]);
        assert_eq!(settings.plugins.guess, vec!["nfo", "filename"]);
        assert_eq!(settings.tmdb.poster_size, "w500");
    }

    #[test]
    fn test_load_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[general]
languages = ["de", "en"]
dry_run = true

[tmdb]
api_key = "secret"

[paths.movie]
base = "/library/movies"
media = "{title}/{title}.{ext}"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.general.languages, vec!["de", "en"]);
        assert!(settings.general.dry_run);
        assert_eq!(settings.general.organize_method, "move");
        assert_eq!(settings.tmdb.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.tmdb.search_language, "en");
        assert_eq!(settings.paths.movie.base, PathBuf::from("/library/movies"));
        assert!(settings.paths.movie.images.is_empty());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nlanguages = []\n").unwrap();

        let result = Settings::load(Some(&path));
        assert!(matches!(result, Err(ScraperError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = Settings::load(Some(Path::new("/nonexistent/reelsort.toml")));
        assert!(matches!(result, Err(ScraperError::InvalidConfig(_))));
    }

    #[test]
    fn test_to_toml() {
        let rendered = Settings::default().to_toml().unwrap();
        assert!(rendered.contains("[general]"));
        assert!(rendered.contains("organize_method = \"move\""));
    }
}
