use crate::scraper::types::{
    Guess, IdType, Identifier, ImageSet, ImageType, MediaType, Metadata, MetadataField as F,
    MetadataValue, Person,
};
use anyhow::Result;
use quick_xml::se::to_string;
use serde::Serialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Everything a sidecar describes
pub struct NfoSource<'a> {
    pub identifier: &'a Identifier,
    pub metadata: &'a Metadata,
    pub images: &'a ImageSet,
    /// Guess of the sorted file; only set for the file's own sidecar
    pub guess: Option<&'a Guess>,
}

/// NFO file writer for Kodi/Jellyfin/Emby compatibility
#[derive(Debug, Clone, Copy)]
pub struct NfoWriter {
    overwrite: bool,
    dry_run: bool,
}

impl NfoWriter {
    pub fn new(overwrite: bool, dry_run: bool) -> Self {
        Self { overwrite, dry_run }
    }

    /// Write the sidecar for `source` to `path`. Returns whether it was
    /// written (or would have been, in a dry run).
    pub async fn write(&self, path: &Path, source: &NfoSource<'_>) -> Result<bool> {
        if !self.overwrite && tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("Sidecar {} already present", path.display());
            return Ok(false);
        }

        let xml = match source.identifier.media_type {
            MediaType::Movie => to_string(&MovieNfo::from(source))?,
            MediaType::TvShow => to_string(&TvShowNfo::from(source))?,
            MediaType::Season => to_string(&SeasonNfo::from(source))?,
            MediaType::Episode => to_string(&EpisodeNfo::from(source))?,
        };

        if self.dry_run {
            info!("Would write {}", path.display());
            return Ok(true);
        }

        Self::write_nfo(path, &xml).await?;
        info!("Wrote {}", path.display());
        Ok(true)
    }

    async fn write_nfo(path: &Path, xml: &str) -> Result<()> {
        let content = format!("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n{xml}\n");

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

// NFO structures

#[derive(Serialize)]
#[serde(rename = "movie")]
struct MovieNfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    originaltitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tagline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    premiered: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    set: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mpaa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    votes: Option<u64>,
    #[serde(rename = "uniqueid")]
    uniqueids: Vec<UniqueId>,
    genre: Vec<String>,
    country: Vec<String>,
    studio: Vec<String>,
    director: Vec<String>,
    credits: Vec<String>,
    actor: Vec<ActorNfo>,
    thumb: Vec<ThumbNfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fanart: Option<FanartNfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    releasegroup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl From<&NfoSource<'_>> for MovieNfo {
    fn from(s: &NfoSource<'_>) -> Self {
        let m = s.metadata;
        Self {
            title: text(m, F::Title),
            originaltitle: text(m, F::OriginalTitle),
            tagline: text(m, F::Tagline),
            plot: text(m, F::Plot),
            year: m.year_of(F::Premiered),
            premiered: text(m, F::Premiered),
            set: text(m, F::Set),
            mpaa: text(m, F::Certification),
            rating: number(m, F::Rating),
            votes: count(m, F::Votes),
            uniqueids: unique_ids(s.identifier),
            genre: m.list(F::Genres).to_vec(),
            country: m.list(F::Countries).to_vec(),
            studio: m.list(F::Studios).to_vec(),
            director: m.list(F::Directors).to_vec(),
            credits: m.list(F::Writers).to_vec(),
            actor: actors(m),
            thumb: thumbs(s.images, &[ImageType::Poster, ImageType::Logo, ImageType::Disc]),
            fanart: FanartNfo::from_images(s.images),
            releasegroup: s.guess.and_then(|g| g.release_group.clone()),
            source: s.guess.and_then(|g| g.source.clone()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename = "tvshow")]
struct TvShowNfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    originaltitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    premiered: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mpaa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    votes: Option<u64>,
    #[serde(rename = "uniqueid")]
    uniqueids: Vec<UniqueId>,
    genre: Vec<String>,
    studio: Vec<String>,
    credits: Vec<String>,
    actor: Vec<ActorNfo>,
    thumb: Vec<ThumbNfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fanart: Option<FanartNfo>,
}

impl From<&NfoSource<'_>> for TvShowNfo {
    fn from(s: &NfoSource<'_>) -> Self {
        let m = s.metadata;
        let studio = m
            .list(F::Networks)
            .iter()
            .chain(m.list(F::Studios))
            .cloned()
            .collect();

        Self {
            title: text(m, F::Title),
            originaltitle: text(m, F::OriginalTitle),
            plot: text(m, F::Plot),
            year: m.year_of(F::Premiered),
            premiered: text(m, F::Premiered),
            mpaa: text(m, F::Certification),
            rating: number(m, F::Rating),
            votes: count(m, F::Votes),
            uniqueids: unique_ids(s.identifier),
            genre: m.list(F::Genres).to_vec(),
            studio,
            credits: m.list(F::Creators).to_vec(),
            actor: actors(m),
            thumb: thumbs(
                s.images,
                &[
                    ImageType::Poster,
                    ImageType::Banner,
                    ImageType::Logo,
                    ImageType::ClearArt,
                    ImageType::CharArt,
                ],
            ),
            fanart: FanartNfo::from_images(s.images),
        }
    }
}

#[derive(Serialize)]
#[serde(rename = "season")]
struct SeasonNfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    showtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seasonnumber: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    premiered: Option<String>,
    thumb: Vec<ThumbNfo>,
}

impl From<&NfoSource<'_>> for SeasonNfo {
    fn from(s: &NfoSource<'_>) -> Self {
        let m = s.metadata;
        Self {
            title: text(m, F::Title),
            showtitle: text(m, F::ShowTitle),
            seasonnumber: s.identifier.season,
            plot: text(m, F::Plot),
            premiered: text(m, F::Premiered),
            thumb: thumbs(s.images, &[ImageType::Poster]),
        }
    }
}

#[derive(Serialize)]
#[serde(rename = "episodedetails")]
struct EpisodeNfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    showtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    episode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aired: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    premiered: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mpaa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    votes: Option<u64>,
    #[serde(rename = "uniqueid")]
    uniqueids: Vec<UniqueId>,
    studio: Vec<String>,
    director: Vec<String>,
    credits: Vec<String>,
    actor: Vec<ActorNfo>,
    thumb: Vec<ThumbNfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    releasegroup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl From<&NfoSource<'_>> for EpisodeNfo {
    fn from(s: &NfoSource<'_>) -> Self {
        let m = s.metadata;
        let studio = m
            .list(F::Networks)
            .iter()
            .chain(m.list(F::Studios))
            .cloned()
            .collect();

        Self {
            title: text(m, F::Title),
            showtitle: text(m, F::ShowTitle),
            season: s.identifier.season,
            episode: s.identifier.episode,
            plot: text(m, F::Plot),
            aired: text(m, F::Premiered),
            premiered: text(m, F::ShowPremiered),
            mpaa: text(m, F::Certification),
            rating: number(m, F::Rating),
            votes: count(m, F::Votes),
            uniqueids: unique_ids(s.identifier),
            studio,
            director: m.list(F::Directors).to_vec(),
            credits: m.list(F::Writers).to_vec(),
            actor: actors(m),
            thumb: thumbs(s.images, &[ImageType::Thumbnail]),
            releasegroup: s.guess.and_then(|g| g.release_group.clone()),
            source: s.guess.and_then(|g| g.source.clone()),
        }
    }
}

#[derive(Serialize)]
struct UniqueId {
    #[serde(rename = "@type")]
    id_type: &'static str,
    #[serde(rename = "@default")]
    default: bool,
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Serialize)]
struct ActorNfo {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<u32>,
}

impl From<&Person> for ActorNfo {
    fn from(p: &Person) -> Self {
        Self {
            name: p.name.clone(),
            role: p.role.clone(),
            thumb: p.thumb.clone(),
            order: p.order,
        }
    }
}

#[derive(Serialize)]
struct ThumbNfo {
    #[serde(rename = "@aspect")]
    aspect: &'static str,
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Serialize)]
struct FanartNfo {
    thumb: Vec<ThumbNfo>,
}

impl FanartNfo {
    fn from_images(images: &ImageSet) -> Option<Self> {
        images.get(ImageType::Background).map(|url| Self {
            thumb: vec![ThumbNfo {
                aspect: "fanart",
                value: url.to_string(),
            }],
        })
    }
}

fn text(metadata: &Metadata, field: F) -> Option<String> {
    metadata.text(field).map(str::to_string)
}

fn number(metadata: &Metadata, field: F) -> Option<f64> {
    match metadata.get(field)? {
        MetadataValue::Number(value) => Some(*value),
        MetadataValue::Count(value) => Some(*value as f64),
        MetadataValue::Text(value) => value.trim().parse().ok(),
        _ => None,
    }
}

fn count(metadata: &Metadata, field: F) -> Option<u64> {
    match metadata.get(field)? {
        MetadataValue::Count(value) => Some(*value),
        MetadataValue::Number(value) if *value >= 0.0 => Some(value.round() as u64),
        MetadataValue::Text(value) => value.trim().parse().ok(),
        _ => None,
    }
}

/// The primary catalog id is the default one
fn unique_ids(identifier: &Identifier) -> Vec<UniqueId> {
    [IdType::Tmdb, IdType::Imdb, IdType::Tvdb]
        .into_iter()
        .filter_map(|id_type| {
            identifier.ids.get(id_type).map(|value| UniqueId {
                id_type: id_type.as_str(),
                default: id_type == IdType::Tmdb,
                value: value.to_string(),
            })
        })
        .collect()
}

fn actors(metadata: &Metadata) -> Vec<ActorNfo> {
    metadata.people(F::Actors).iter().map(ActorNfo::from).collect()
}

fn thumbs(images: &ImageSet, types: &[ImageType]) -> Vec<ThumbNfo> {
    types
        .iter()
        .filter_map(|image_type| {
            images.get(*image_type).map(|url| ThumbNfo {
                aspect: image_type.as_str(),
                value: url.to_string(),
            })
        })
        .collect()
}
