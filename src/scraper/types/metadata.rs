use super::IdType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named field of a metadata record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Title,
    OriginalTitle,
    ShowTitle,
    Premiered,
    ShowPremiered,
    Tagline,
    Plot,
    Set,
    Certification,
    Rating,
    Votes,
    Creators,
    Studios,
    Networks,
    Countries,
    Genres,
    Directors,
    Writers,
    Actors,
}

impl MetadataField {
    pub const ALL: &'static [MetadataField] = &[
        Self::Title,
        Self::OriginalTitle,
        Self::ShowTitle,
        Self::Premiered,
        Self::ShowPremiered,
        Self::Tagline,
        Self::Plot,
        Self::Set,
        Self::Certification,
        Self::Rating,
        Self::Votes,
        Self::Creators,
        Self::Studios,
        Self::Networks,
        Self::Countries,
        Self::Genres,
        Self::Directors,
        Self::Writers,
        Self::Actors,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::OriginalTitle => "original_title",
            Self::ShowTitle => "show_title",
            Self::Premiered => "premiered",
            Self::ShowPremiered => "show_premiered",
            Self::Tagline => "tagline",
            Self::Plot => "plot",
            Self::Set => "set",
            Self::Certification => "certification",
            Self::Rating => "rating",
            Self::Votes => "votes",
            Self::Creators => "creators",
            Self::Studios => "studios",
            Self::Networks => "networks",
            Self::Countries => "countries",
            Self::Genres => "genres",
            Self::Directors => "directors",
            Self::Writers => "writers",
            Self::Actors => "actors",
        }
    }
}

impl std::fmt::Display for MetadataField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetadataField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("Unknown metadata field: {s}"))
    }
}

/// Person information (cast/crew)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Name
    pub name: String,
    /// Character name for cast members
    pub role: Option<String>,
    /// Profile image URL
    pub thumb: Option<String>,
    /// Billing order
    pub order: Option<u32>,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
            thumb: None,
            order: None,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Option<String>) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_thumb(mut self, thumb: Option<String>) -> Self {
        self.thumb = thumb;
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: Option<u32>) -> Self {
        self.order = order;
        self
    }
}

/// Value of a single metadata field.
///
/// Providers pass numbers and dates through as they receive them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
    Count(u64),
    List(Vec<String>),
    People(Vec<Person>),
}

impl MetadataValue {
    /// Empty strings and lists count as null
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::List(list) => list.is_empty(),
            Self::People(people) => people.is_empty(),
            Self::Number(_) | Self::Count(_) => false,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_people(&self) -> Option<&[Person]> {
        match self {
            Self::People(people) => Some(people),
            _ => None,
        }
    }

    /// Plain string form used for path rendering
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => format!("{number:.1}"),
            Self::Count(count) => count.to_string(),
            Self::List(list) => list.join(", "),
            Self::People(people) => people
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<Person>> for MetadataValue {
    fn from(value: Vec<Person>) -> Self {
        Self::People(value)
    }
}

/// Resolved metadata record. A missing field is null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    fields: BTreeMap<MetadataField, MetadataValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: MetadataField) -> Option<&MetadataValue> {
        self.fields.get(&field)
    }

    /// Set a field; empty values are dropped
    pub fn set(&mut self, field: MetadataField, value: impl Into<MetadataValue>) {
        let value = value.into();
        if value.is_empty() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, value);
        }
    }

    /// Set a field only when a value is present
    pub fn set_opt<V: Into<MetadataValue>>(&mut self, field: MetadataField, value: Option<V>) {
        if let Some(value) = value {
            self.set(field, value);
        }
    }

    pub fn contains(&self, field: MetadataField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn text(&self, field: MetadataField) -> Option<&str> {
        self.get(field).and_then(MetadataValue::as_text)
    }

    pub fn list(&self, field: MetadataField) -> &[String] {
        self.get(field).and_then(MetadataValue::as_list).unwrap_or(&[])
    }

    pub fn people(&self, field: MetadataField) -> &[Person] {
        self.get(field)
            .and_then(MetadataValue::as_people)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetadataField, &MetadataValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Year part of a `YYYY-MM-DD` date field
    pub fn year_of(&self, field: MetadataField) -> Option<i32> {
        self.text(field)
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok())
    }
}

/// Kind of artwork attached to a media entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Poster,
    Background,
    Logo,
    Disc,
    Art,
    ClearArt,
    Banner,
    CharArt,
    Thumbnail,
}

impl ImageType {
    pub const ALL: &'static [ImageType] = &[
        Self::Poster,
        Self::Background,
        Self::Logo,
        Self::Disc,
        Self::Art,
        Self::ClearArt,
        Self::Banner,
        Self::CharArt,
        Self::Thumbnail,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poster => "poster",
            Self::Background => "background",
            Self::Logo => "logo",
            Self::Disc => "disc",
            Self::Art => "art",
            Self::ClearArt => "clearart",
            Self::Banner => "banner",
            Self::CharArt => "charart",
            Self::Thumbnail => "thumbnail",
        }
    }
}

impl std::fmt::Display for ImageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|image| image.as_str() == s)
            .ok_or_else(|| format!("Unknown image type: {s}"))
    }
}

/// Image URLs for a media item. A missing type is null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSet {
    images: BTreeMap<ImageType, String>,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, image_type: ImageType) -> Option<&str> {
        self.images.get(&image_type).map(String::as_str)
    }

    pub fn set(&mut self, image_type: ImageType, url: impl Into<String>) {
        let url = url.into();
        if !url.is_empty() {
            self.images.insert(image_type, url);
        }
    }

    pub fn contains(&self, image_type: ImageType) -> bool {
        self.images.contains_key(&image_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImageType, &str)> {
        self.images.iter().map(|(kind, url)| (*kind, url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// External IDs for cross-referencing
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalIds {
    pub tmdb: Option<String>,
    pub imdb: Option<String>,
    pub tvdb: Option<String>,
}

impl ExternalIds {
    pub fn get(&self, id_type: IdType) -> Option<&str> {
        match id_type {
            IdType::Tmdb => self.tmdb.as_deref(),
            IdType::Imdb => self.imdb.as_deref(),
            IdType::Tvdb => self.tvdb.as_deref(),
        }
    }

    /// Overwrite one slot; blank values clear it
    pub fn set(&mut self, id_type: IdType, value: Option<String>) {
        let value = value.filter(|v| !v.trim().is_empty());
        match id_type {
            IdType::Tmdb => self.tmdb = value,
            IdType::Imdb => self.imdb = value,
            IdType::Tvdb => self.tvdb = value,
        }
    }

    /// Check if any ID is set
    pub fn has_any(&self) -> bool {
        self.tmdb.is_some() || self.imdb.is_some() || self.tvdb.is_some()
    }

    /// Fill empty slots from `other`; slots already set are kept
    pub fn fill_from(&mut self, other: &ExternalIds) {
        for id_type in [IdType::Tmdb, IdType::Imdb, IdType::Tvdb] {
            if self.get(id_type).is_none() {
                self.set(id_type, other.get(id_type).map(str::to_string));
            }
        }
    }

    /// Requested namespaces that are still null
    pub fn missing(&self, wanted: &[IdType]) -> Vec<IdType> {
        wanted
            .iter()
            .copied()
            .filter(|id_type| self.get(*id_type).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_ids_fill_keeps_existing() {
        let mut ids1 = ExternalIds {
            imdb: Some("tt1234567".to_string()),
            tmdb: Some("123".to_string()),
            ..Default::default()
        };

        let ids2 = ExternalIds {
            tmdb: Some("456".to_string()),
            tvdb: Some("789".to_string()),
            ..Default::default()
        };

        ids1.fill_from(&ids2);

        assert_eq!(ids1.imdb.as_deref(), Some("tt1234567"));
        assert_eq!(ids1.tmdb.as_deref(), Some("123"));
        assert_eq!(ids1.tvdb.as_deref(), Some("789"));
    }

    #[test]
    fn test_external_ids_missing() {
        let ids = ExternalIds {
            tmdb: Some("1".to_string()),
            ..Default::default()
        };
        assert!(ids.has_any());
        assert_eq!(
            ids.missing(&[IdType::Tmdb, IdType::Tvdb]),
            vec![IdType::Tvdb]
        );
        assert!(!ExternalIds::default().has_any());
    }

    #[test]
    fn test_metadata_drops_empty_values() {
        let mut metadata = Metadata::new();
        metadata.set(MetadataField::Title, "The Matrix");
        metadata.set(MetadataField::Plot, "   ");
        metadata.set(MetadataField::Genres, Vec::<String>::new());

        assert_eq!(metadata.text(MetadataField::Title), Some("The Matrix"));
        assert!(!metadata.contains(MetadataField::Plot));
        assert!(!metadata.contains(MetadataField::Genres));
        assert_eq!(metadata.len(), 1);
    }

    #[test]
    fn test_metadata_year_of() {
        let mut metadata = Metadata::new();
        metadata.set(MetadataField::Premiered, "1999-03-30");
        assert_eq!(metadata.year_of(MetadataField::Premiered), Some(1999));
        assert_eq!(metadata.year_of(MetadataField::ShowPremiered), None);
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in MetadataField::ALL {
            assert_eq!(field.as_str().parse::<MetadataField>().unwrap(), *field);
        }
        assert_eq!("clearart".parse::<ImageType>().unwrap(), ImageType::ClearArt);
    }
}
