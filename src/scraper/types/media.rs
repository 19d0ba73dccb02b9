use super::metadata::{ImageType, MetadataField};
use serde::{Deserialize, Serialize};

/// Kind of media entity handled by the sorter.
///
/// Each variant carries a static schema: which catalog ids identify it, which
/// metadata fields and image types it has, and which related entities
/// (successors) are resolved alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    TvShow,
    Season,
    Episode,
}

/// Catalog namespace an id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    /// Primary catalog (The Movie Database)
    Tmdb,
    /// General video identity (IMDb)
    Imdb,
    /// Episodic identity (TheTVDB)
    Tvdb,
}

/// Fields of a guess that can be required by a media type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuessField {
    Season,
    Episode,
}

use MetadataField as F;

const MOVIE_FIELDS: &[MetadataField] = &[
    F::Title,
    F::OriginalTitle,
    F::Premiered,
    F::Tagline,
    F::Plot,
    F::Set,
    F::Certification,
    F::Rating,
    F::Votes,
    F::Studios,
    F::Countries,
    F::Genres,
    F::Directors,
    F::Writers,
    F::Actors,
];

const TVSHOW_FIELDS: &[MetadataField] = &[
    F::Title,
    F::OriginalTitle,
    F::Premiered,
    F::Plot,
    F::Certification,
    F::Rating,
    F::Votes,
    F::Creators,
    F::Studios,
    F::Networks,
    F::Genres,
    F::Actors,
];

const SEASON_FIELDS: &[MetadataField] = &[F::Title, F::ShowTitle, F::Premiered, F::Plot];

const EPISODE_FIELDS: &[MetadataField] = &[
    F::Title,
    F::ShowTitle,
    F::Premiered,
    F::ShowPremiered,
    F::Plot,
    F::Rating,
    F::Votes,
    F::Studios,
    F::Networks,
    F::Certification,
    F::Directors,
    F::Writers,
    F::Actors,
];

const MOVIE_IMAGES: &[ImageType] = &[
    ImageType::Poster,
    ImageType::Background,
    ImageType::Logo,
    ImageType::Disc,
    ImageType::Art,
    ImageType::ClearArt,
    ImageType::Banner,
];

const TVSHOW_IMAGES: &[ImageType] = &[
    ImageType::Poster,
    ImageType::Background,
    ImageType::Logo,
    ImageType::Art,
    ImageType::ClearArt,
    ImageType::Banner,
    ImageType::CharArt,
];

impl MediaType {
    /// Media types a guess can resolve to
    pub const GUESSABLE: &'static [MediaType] = &[MediaType::Movie, MediaType::Episode];

    /// Id namespaces that can identify this media type
    #[must_use]
    pub const fn id_types(self) -> &'static [IdType] {
        match self {
            Self::Movie => &[IdType::Tmdb, IdType::Imdb],
            Self::TvShow | Self::Episode => &[IdType::Tmdb, IdType::Imdb, IdType::Tvdb],
            Self::Season => &[IdType::Tmdb, IdType::Tvdb],
        }
    }

    /// Guess fields that must be present besides filepath, type and title
    #[must_use]
    pub const fn needed_guess(self) -> &'static [GuessField] {
        match self {
            Self::Episode => &[GuessField::Season, GuessField::Episode],
            Self::Season => &[GuessField::Season],
            Self::Movie | Self::TvShow => &[],
        }
    }

    /// Metadata schema of this media type
    #[must_use]
    pub const fn metadata_fields(self) -> &'static [MetadataField] {
        match self {
            Self::Movie => MOVIE_FIELDS,
            Self::TvShow => TVSHOW_FIELDS,
            Self::Season => SEASON_FIELDS,
            Self::Episode => EPISODE_FIELDS,
        }
    }

    /// Image types this media type can have
    #[must_use]
    pub const fn image_types(self) -> &'static [ImageType] {
        match self {
            Self::Movie => MOVIE_IMAGES,
            Self::TvShow => TVSHOW_IMAGES,
            Self::Season => &[ImageType::Poster],
            Self::Episode => &[ImageType::Thumbnail],
        }
    }

    /// Related entities resolved while processing this media type
    #[must_use]
    pub const fn successors(self) -> &'static [MediaType] {
        match self {
            Self::Episode => &[Self::TvShow, Self::Season],
            Self::Season => &[Self::TvShow],
            Self::Movie | Self::TvShow => &[],
        }
    }

    /// Fields taken from the parent show as `(own field, show field)` pairs
    #[must_use]
    pub const fn inherited_fields(self) -> &'static [(MetadataField, MetadataField)] {
        match self {
            Self::Episode => &[
                (F::ShowTitle, F::Title),
                (F::ShowPremiered, F::Premiered),
                (F::Studios, F::Studios),
                (F::Networks, F::Networks),
                (F::Certification, F::Certification),
            ],
            Self::Season => &[(F::ShowTitle, F::Title)],
            Self::Movie | Self::TvShow => &[],
        }
    }

    /// Template keys derived from the identifier and metadata of this type
    #[must_use]
    pub const fn derived_keys(self) -> &'static [&'static str] {
        match self {
            Self::Movie => &["year", "ext"],
            Self::TvShow => &["year"],
            Self::Season => &["show_year", "season"],
            Self::Episode => &["year", "show_year", "season", "episode", "ext"],
        }
    }

    /// Whether this type is identified by a season number
    #[must_use]
    pub const fn has_season(self) -> bool {
        matches!(self, Self::Season | Self::Episode)
    }

    /// Whether this type is identified by an episode number
    #[must_use]
    pub const fn has_episode(self) -> bool {
        matches!(self, Self::Episode)
    }

    /// Config/section name of the type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::TvShow => "tvshow",
            Self::Season => "season",
            Self::Episode => "episode",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(Self::Movie),
            "tvshow" | "tv" | "show" => Ok(Self::TvShow),
            "season" => Ok(Self::Season),
            "episode" | "ep" => Ok(Self::Episode),
            _ => Err(format!("Unknown media type: {s}")),
        }
    }
}

impl IdType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tmdb => "tmdb",
            Self::Imdb => "imdb",
            Self::Tvdb => "tvdb",
        }
    }
}

impl std::fmt::Display for IdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tmdb" | "themoviedb" => Ok(Self::Tmdb),
            "imdb" => Ok(Self::Imdb),
            "tvdb" | "thetvdb" => Ok(Self::Tvdb),
            _ => Err(format!("Unknown id type: {s}")),
        }
    }
}

/// A single search hit from a remote catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Provider-specific ID
    pub id: String,
    /// Primary title
    pub title: String,
    /// Original/native title
    pub original_title: Option<String>,
    /// Release or first-air year
    pub year: Option<i32>,
    /// Short description
    pub overview: Option<String>,
    /// Media type of the hit
    pub media_type: MediaType,
    /// Provider name (e.g., "tmdb")
    pub provider: String,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            original_title: None,
            year: None,
            overview: None,
            media_type: MediaType::Movie,
            provider: provider.into(),
        }
    }

    /// Builder pattern: set media type
    #[must_use]
    pub fn with_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    /// Builder pattern: set year
    #[must_use]
    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    /// Builder pattern: set original title
    #[must_use]
    pub fn with_original_title(mut self, title: Option<String>) -> Self {
        self.original_title = title;
        self
    }

    /// Builder pattern: set overview
    #[must_use]
    pub fn with_overview(mut self, overview: Option<String>) -> Self {
        self.overview = overview;
        self
    }

    /// Title as shown to the user and used for matching: `Title (Year)`
    #[must_use]
    pub fn display_title(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({year})", self.title),
            None => self.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_of_episode_is_own_or_inherited() {
        let inherited: Vec<_> = MediaType::Episode
            .inherited_fields()
            .iter()
            .map(|(own, _)| *own)
            .collect();
        for (own, show) in MediaType::Episode.inherited_fields() {
            assert!(MediaType::Episode.metadata_fields().contains(own));
            assert!(MediaType::TvShow.metadata_fields().contains(show));
        }
        assert!(!inherited.contains(&MetadataField::Title));
    }

    #[test]
    fn test_episode_successors() {
        assert_eq!(
            MediaType::Episode.successors(),
            &[MediaType::TvShow, MediaType::Season]
        );
        assert!(MediaType::Movie.successors().is_empty());
    }

    #[test]
    fn test_media_type_parse() {
        assert_eq!("movie".parse::<MediaType>().unwrap(), MediaType::Movie);
        assert_eq!("Episode".parse::<MediaType>().unwrap(), MediaType::Episode);
        assert_eq!("tv".parse::<MediaType>().unwrap(), MediaType::TvShow);
        assert!("album".parse::<MediaType>().is_err());
    }

    #[test]
    fn test_candidate_display_title() {
        let with_year = Candidate::new("603", "The Matrix", "tmdb").with_year(Some(1999));
        assert_eq!(with_year.display_title(), "The Matrix (1999)");

        let without_year = Candidate::new("1", "Show Name", "tmdb");
        assert_eq!(without_year.display_title(), "Show Name");
    }
}
