use super::{ExternalIds, GuessField, MediaType};
use crate::scraper::{Result, ScraperError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Guess offered by a single provider. Every field is optional.
///
/// `titles` and `episodes` are lists because a filename may match several
/// candidates (`S01E01E02`); the first element wins when finalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialGuess {
    pub media_type: Option<MediaType>,
    pub titles: Vec<String>,
    pub year: Option<i32>,
    pub season: Option<u32>,
    pub episodes: Vec<u32>,
    pub release_group: Option<String>,
    pub source: Option<String>,
    pub ids: ExternalIds,
}

impl PartialGuess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set media type
    #[must_use]
    pub fn with_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }

    /// Builder pattern: add a title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.titles.push(title.into());
        self
    }

    /// Builder pattern: set year
    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Builder pattern: set season and episode
    #[must_use]
    pub fn with_episode(mut self, season: u32, episode: u32) -> Self {
        self.season = Some(season);
        self.episodes.push(episode);
        self
    }

    /// Builder pattern: set release group
    #[must_use]
    pub fn with_release_group(mut self, group: impl Into<String>) -> Self {
        self.release_group = Some(group.into());
        self
    }

    /// Builder pattern: set external ids
    #[must_use]
    pub fn with_ids(mut self, ids: ExternalIds) -> Self {
        self.ids = ids;
        self
    }

    /// Merge `other` into self. Fields already holding a value are kept.
    pub fn merge(&mut self, other: PartialGuess) {
        if self.media_type.is_none() {
            self.media_type = other.media_type;
        }
        if self.titles.is_empty() {
            self.titles = other
                .titles
                .into_iter()
                .filter(|t| !t.trim().is_empty())
                .collect();
        }
        if self.year.is_none() {
            self.year = other.year;
        }
        if self.season.is_none() {
            self.season = other.season;
        }
        if self.episodes.is_empty() {
            self.episodes = other.episodes;
        }
        if self.release_group.is_none() {
            self.release_group = other.release_group.filter(|g| !g.is_empty());
        }
        if self.source.is_none() {
            self.source = other.source.filter(|s| !s.is_empty());
        }
        self.ids.fill_from(&other.ids);
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Finalized guess about a video file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub filepath: PathBuf,
    pub media_type: MediaType,
    pub title: String,
    pub year: Option<i32>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub release_group: Option<String>,
    pub source: Option<String>,
    /// Ids already known from a sidecar
    pub ids: ExternalIds,
}

impl Guess {
    /// Validate a merged guess: title, media type and the fields needed by
    /// that type must be present.
    pub fn finalize(filepath: &Path, partial: PartialGuess) -> Result<Self> {
        if filepath.as_os_str().is_empty() {
            return Err(ScraperError::NotEnoughData("empty file path".into()));
        }

        let media_type = partial.media_type.ok_or_else(|| {
            ScraperError::NotEnoughData(format!("no media type guessed for {}", filepath.display()))
        })?;
        if !MediaType::GUESSABLE.contains(&media_type) {
            return Err(ScraperError::InvalidMediaType(media_type));
        }

        let title = partial
            .titles
            .into_iter()
            .find(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ScraperError::NotEnoughData(format!("no title guessed for {}", filepath.display()))
            })?;

        let episode = partial.episodes.first().copied();
        for needed in media_type.needed_guess() {
            let present = match needed {
                GuessField::Season => partial.season.is_some(),
                GuessField::Episode => episode.is_some(),
            };
            if !present {
                return Err(ScraperError::NotEnoughData(format!(
                    "{media_type} guess for {} lacks {needed:?}",
                    filepath.display()
                )));
            }
        }

        let (season, episode) = if media_type.has_season() {
            (partial.season, episode)
        } else {
            (None, None)
        };

        Ok(Self {
            filepath: filepath.to_path_buf(),
            media_type,
            title,
            year: partial.year,
            season,
            episode,
            release_group: partial.release_group,
            source: partial.source,
            ids: partial.ids,
        })
    }

    /// Search query as matched against candidate display titles
    pub fn query(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({year})", self.title),
            None => self.title.clone(),
        }
    }

    /// Lowercased file extension without the dot
    pub fn extension(&self) -> Option<String> {
        self.filepath
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
    }
}

/// Cross-referenced catalog ids for one media entity.
///
/// Episodes and seasons carry the ids of their show together with the
/// season/episode numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub media_type: MediaType,
    pub ids: ExternalIds,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl Identifier {
    /// Empty identifier shaped after a guess
    pub fn seed(guess: &Guess) -> Self {
        Self {
            media_type: guess.media_type,
            ids: ExternalIds::default(),
            season: guess.season.filter(|_| guess.media_type.has_season()),
            episode: guess.episode.filter(|_| guess.media_type.has_episode()),
        }
    }

    pub fn new(media_type: MediaType, ids: ExternalIds) -> Self {
        Self {
            media_type,
            ids,
            season: None,
            episode: None,
        }
    }

    #[must_use]
    pub fn with_season(mut self, season: u32) -> Self {
        self.season = Some(season);
        self
    }

    #[must_use]
    pub fn with_episode(mut self, episode: u32) -> Self {
        self.episode = Some(episode);
        self
    }

    /// Identifier of a related entity (the show or season of an episode)
    pub fn successor(&self, media_type: MediaType) -> Self {
        Self {
            media_type,
            ids: self.ids.clone(),
            season: self.season.filter(|_| media_type.has_season()),
            episode: self.episode.filter(|_| media_type.has_episode()),
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.media_type)?;
        for id_type in self.media_type.id_types() {
            if let Some(id) = self.ids.get(*id_type) {
                write!(f, " {id_type}={id}")?;
            }
        }
        if let Some(season) = self.season {
            write!(f, " S{season:02}")?;
        }
        if let Some(episode) = self.episode {
            write!(f, "E{episode:02}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_first_wins() {
        let mut guess = PartialGuess::new().with_title("From Sidecar");
        guess.merge(
            PartialGuess::new()
                .with_title("From Filename")
                .with_type(MediaType::Movie)
                .with_year(1999),
        );

        assert_eq!(guess.titles, vec!["From Sidecar".to_string()]);
        assert_eq!(guess.media_type, Some(MediaType::Movie));
        assert_eq!(guess.year, Some(1999));
    }

    #[test]
    fn test_finalize_takes_first_of_lists() {
        let mut partial = PartialGuess::new()
            .with_type(MediaType::Episode)
            .with_title("Show Name")
            .with_title("Other")
            .with_episode(1, 1);
        partial.episodes.push(2);

        let guess = Guess::finalize(Path::new("/in/Show.S01E01E02.mkv"), partial).unwrap();
        assert_eq!(guess.title, "Show Name");
        assert_eq!(guess.episode, Some(1));
        assert_eq!(guess.extension().as_deref(), Some("mkv"));
    }

    #[test]
    fn test_finalize_episode_needs_numbers() {
        let partial = PartialGuess::new()
            .with_type(MediaType::Episode)
            .with_title("Show Name");

        let result = Guess::finalize(Path::new("/in/show.mkv"), partial);
        assert!(matches!(result, Err(ScraperError::NotEnoughData(_))));
    }

    #[test]
    fn test_finalize_needs_type_and_title() {
        let no_type = PartialGuess::new().with_title("Title");
        assert!(matches!(
            Guess::finalize(Path::new("/in/a.mkv"), no_type),
            Err(ScraperError::NotEnoughData(_))
        ));

        let no_title = PartialGuess::new().with_type(MediaType::Movie);
        assert!(matches!(
            Guess::finalize(Path::new("/in/a.mkv"), no_title),
            Err(ScraperError::NotEnoughData(_))
        ));
    }

    #[test]
    fn test_successor_drops_episode() {
        let episode = Identifier::new(
            MediaType::Episode,
            ExternalIds {
                tmdb: Some("1399".into()),
                ..Default::default()
            },
        )
        .with_season(2)
        .with_episode(5);

        let season = episode.successor(MediaType::Season);
        assert_eq!(season.season, Some(2));
        assert_eq!(season.episode, None);

        let show = episode.successor(MediaType::TvShow);
        assert_eq!(show.season, None);
        assert_eq!(show.ids.tmdb.as_deref(), Some("1399"));
        assert_eq!(episode.to_string(), "episode tmdb=1399 S02E05");
    }
}
