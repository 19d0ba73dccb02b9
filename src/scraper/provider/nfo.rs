use super::traits::{GuessProvider, IdentifierProvider, Plugin};
use crate::scraper::{
    Result,
    matcher::Disambiguation,
    types::{ExternalIds, Guess, IdType, Identifier, MediaType, PartialGuess},
};
use async_trait::async_trait;
use quick_xml::events::Event;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::debug;

static IMDB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"tt\d{7,8}").expect("Invalid imdb id regex"));

/// Reads hints from a `<basename>.nfo` sidecar next to the video file
#[derive(Debug, Default)]
pub struct NfoProvider;

impl NfoProvider {
    pub const NAME: &'static str = "nfo";

    pub fn new() -> Self {
        Self
    }

    /// Sidecar path for a video file
    #[must_use]
    pub fn sidecar_path(filepath: &Path) -> PathBuf {
        filepath.with_extension("nfo")
    }
}

impl Plugin for NfoProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn into_guess(self: Arc<Self>) -> Option<Arc<dyn GuessProvider>> {
        Some(self)
    }

    fn into_identifier(self: Arc<Self>) -> Option<Arc<dyn IdentifierProvider>> {
        Some(self)
    }
}

#[async_trait]
impl GuessProvider for NfoProvider {
    async fn guess(&self, filepath: &Path) -> Result<Option<PartialGuess>> {
        let Some(sidecar) = read_sidecar(&Self::sidecar_path(filepath)).await? else {
            return Ok(None);
        };

        let (media_type, title) = match sidecar.root.as_str() {
            "movie" => (Some(MediaType::Movie), sidecar.fields.title.clone()),
            "episodedetails" => (Some(MediaType::Episode), sidecar.fields.showtitle.clone()),
            _ => (None, None),
        };

        let fields = &sidecar.fields;
        Ok(Some(PartialGuess {
            media_type,
            titles: non_empty(title).into_iter().collect(),
            year: parse_number(fields.year.as_deref()),
            season: parse_number(fields.season.as_deref()),
            episodes: parse_number(fields.episode.as_deref()).into_iter().collect(),
            release_group: non_empty(fields.releasegroup.clone()),
            source: non_empty(fields.source.clone()),
            ids: fields.external_ids(),
        }))
    }
}

#[async_trait]
impl IdentifierProvider for NfoProvider {
    fn supplied_ids(&self, media_type: MediaType) -> &'static [IdType] {
        media_type.id_types()
    }

    async fn identify(
        &self,
        guess: &Guess,
        _current: &Identifier,
        _disambiguation: &Disambiguation,
    ) -> Result<Option<ExternalIds>> {
        let path = Self::sidecar_path(&guess.filepath);

        if let Some(sidecar) = read_sidecar(&path).await? {
            let ids = sidecar.fields.external_ids();
            return Ok(ids.has_any().then_some(ids));
        }

        // Plain-text sidecars (scene .nfo files) often carry an IMDb link
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8_lossy(&bytes);
        Ok(IMDB_ID.find(&text).map(|m| ExternalIds {
            imdb: Some(m.as_str().to_string()),
            ..Default::default()
        }))
    }
}

/// Parsed XML sidecar
#[derive(Debug)]
struct Sidecar {
    root: String,
    fields: SidecarFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SidecarFields {
    title: Option<String>,
    showtitle: Option<String>,
    year: Option<String>,
    season: Option<String>,
    episode: Option<String>,
    releasegroup: Option<String>,
    source: Option<String>,
    id: Option<String>,
    tmdb_id: Option<String>,
    #[serde(rename = "uniqueid")]
    uniqueids: Vec<UniqueIdEntry>,
    ids: Option<IdsEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UniqueIdEntry {
    #[serde(rename = "@type")]
    id_type: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IdsEntry {
    tmdb: Option<String>,
    imdb: Option<String>,
    tvdb: Option<String>,
}

impl SidecarFields {
    /// Ids in precedence order: `<uniqueid>`, `<ids>`, then legacy tags
    fn external_ids(&self) -> ExternalIds {
        let mut ids = ExternalIds::default();

        for entry in &self.uniqueids {
            let Some(id_type) = entry
                .id_type
                .as_deref()
                .and_then(|t| t.parse::<IdType>().ok())
            else {
                continue;
            };
            if ids.get(id_type).is_none() {
                ids.set(id_type, trimmed(entry.value.as_deref()));
            }
        }

        if let Some(nested) = &self.ids {
            ids.fill_from(&ExternalIds {
                tmdb: trimmed(nested.tmdb.as_deref()),
                imdb: trimmed(nested.imdb.as_deref()),
                tvdb: trimmed(nested.tvdb.as_deref()),
            });
        }

        let legacy_imdb = trimmed(self.id.as_deref()).filter(|id| IMDB_ID.is_match(id));
        ids.fill_from(&ExternalIds {
            tmdb: trimmed(self.tmdb_id.as_deref()),
            imdb: legacy_imdb,
            tvdb: None,
        });

        ids
    }
}

/// Read and parse an XML sidecar. Missing or non-XML files yield `None`.
async fn read_sidecar(path: &Path) -> Result<Option<Sidecar>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidData
            ) =>
        {
            debug!("No readable sidecar at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let Some(root) = root_tag(&content) else {
        debug!("Sidecar {} is not XML", path.display());
        return Ok(None);
    };

    match quick_xml::de::from_str::<SidecarFields>(&content) {
        Ok(fields) => Ok(Some(Sidecar { root, fields })),
        Err(e) => {
            debug!("Failed to parse sidecar {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Name of the document element, if the content is XML
fn root_tag(content: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(content);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(Event::Text(text)) if !text.iter().all(u8::is_ascii_whitespace) => return None,
            Ok(_) => {}
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_empty(value: Option<String>) -> Option<String> {
    trimmed(value.as_deref())
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}
