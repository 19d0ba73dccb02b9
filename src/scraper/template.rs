//! Path templates such as `{title} ({year})/{title} ({year}).{ext}`.
//!
//! Placeholders name a metadata field of the media type or one of the keys
//! derived from the identifier (`year`, `show_year`, `season`, `episode`,
//! `ext`). `{key:02}` zero-pads numeric values.

use crate::scraper::{
    Result, ScraperError,
    types::{Identifier, MediaType, Metadata, MetadataField},
};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Key { name: String, width: Option<usize> },
}

/// Parsed path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            ScraperError::InvalidConfig(format!("path template '{template}': {reason}"))
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut placeholder = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(invalid("unclosed '{'")),
                            Some(c) => placeholder.push(c),
                        }
                    }

                    let (name, width) = match placeholder.split_once(':') {
                        Some((name, width)) => {
                            let width = width
                                .parse::<usize>()
                                .map_err(|_| invalid(&format!("bad width in '{{{placeholder}}}'")))?;
                            (name, Some(width))
                        }
                        None => (placeholder.as_str(), None),
                    };
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(invalid("empty placeholder"));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Key {
                        name: name.to_string(),
                        width,
                    });
                }
                '}' => return Err(invalid("unmatched '}'")),
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Placeholder names in order of appearance
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Key { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Every placeholder must be known for the media type
    pub fn validate(&self, media_type: MediaType) -> Result<()> {
        for key in self.keys() {
            let is_field = key
                .parse::<MetadataField>()
                .is_ok_and(|field| media_type.metadata_fields().contains(&field));
            if !is_field && !media_type.derived_keys().contains(&key) {
                return Err(ScraperError::InvalidConfig(format!(
                    "path template '{}': unknown key '{key}' for {media_type}",
                    self.source
                )));
            }
        }
        Ok(())
    }

    pub fn render(&self, context: &TemplateContext<'_>) -> Result<PathBuf> {
        let mut rendered = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Key { name, width } => {
                    let value = context
                        .value(name)
                        .map(|value| sanitize_filename(&value))
                        .filter(|value| !value.is_empty())
                        .ok_or_else(|| {
                            ScraperError::NotEnoughData(format!(
                                "no value for '{name}' in path template '{}'",
                                self.source
                            ))
                        })?;

                    match (width, value.parse::<u64>()) {
                        (Some(width), Ok(number)) => {
                            rendered.push_str(&format!("{number:0width$}", width = *width));
                        }
                        _ => rendered.push_str(&value),
                    }
                }
            }
        }

        Ok(PathBuf::from(rendered))
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Values available to a template for one media entity
pub struct TemplateContext<'a> {
    metadata: &'a Metadata,
    derived: HashMap<&'static str, String>,
}

impl<'a> TemplateContext<'a> {
    /// `show` is the parent show's metadata for seasons and episodes
    pub fn new(
        metadata: &'a Metadata,
        identifier: &Identifier,
        show: Option<&Metadata>,
        ext: Option<&str>,
    ) -> Self {
        let mut derived = HashMap::new();

        if let Some(year) = metadata.year_of(MetadataField::Premiered) {
            derived.insert("year", year.to_string());
        }
        let show_year = show
            .and_then(|show| show.year_of(MetadataField::Premiered))
            .or_else(|| metadata.year_of(MetadataField::ShowPremiered));
        if let Some(year) = show_year {
            derived.insert("show_year", year.to_string());
        }
        if let Some(season) = identifier.season {
            derived.insert("season", season.to_string());
        }
        if let Some(episode) = identifier.episode {
            derived.insert("episode", episode.to_string());
        }
        if let Some(ext) = ext {
            derived.insert("ext", ext.to_string());
        }

        Self { metadata, derived }
    }

    fn value(&self, key: &str) -> Option<String> {
        if let Some(value) = self.derived.get(key) {
            return Some(value.clone());
        }
        key.parse::<MetadataField>()
            .ok()
            .and_then(|field| self.metadata.get(field))
            .map(|value| value.render())
    }
}

/// Make a value safe to use as a single path component
pub fn sanitize_filename(name: &str) -> String {
    const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

    let mut result: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    result = result.trim().trim_matches('.').to_string();

    while result.contains("  ") {
        result = result.replace("  ", " ");
    }
    while result.contains("__") {
        result = result.replace("__", "_");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::types::ExternalIds;

    fn movie() -> Metadata {
        let mut metadata = Metadata::new();
        metadata.set(MetadataField::Title, "The Matrix");
        metadata.set(MetadataField::Premiered, "1999-03-31");
        metadata
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Movie: The Title"), "Movie_ The Title");
        assert_eq!(sanitize_filename("What?"), "What_");
        assert_eq!(sanitize_filename("A/B\\C"), "A_B_C");
        assert_eq!(sanitize_filename("  spaces  "), "spaces");
    }

    #[test]
    fn test_render_movie() {
        let template = PathTemplate::parse("{title} ({year})/{title} ({year}).{ext}").unwrap();
        template.validate(MediaType::Movie).unwrap();

        let metadata = movie();
        let identifier = Identifier::new(MediaType::Movie, ExternalIds::default());
        let context = TemplateContext::new(&metadata, &identifier, None, Some("mkv"));

        assert_eq!(
            template.render(&context).unwrap(),
            PathBuf::from("The Matrix (1999)/The Matrix (1999).mkv")
        );
    }

    #[test]
    fn test_render_episode_padding() {
        let template = PathTemplate::parse(
            "{show_title}/Season {season:02}/{show_title} - S{season:02}E{episode:02} - {title}",
        )
        .unwrap();
        template.validate(MediaType::Episode).unwrap();

        let mut metadata = Metadata::new();
        metadata.set(MetadataField::Title, "Pilot: Part 1");
        metadata.set(MetadataField::ShowTitle, "Show Name");
        let identifier = Identifier::new(MediaType::Episode, ExternalIds::default())
            .with_season(2)
            .with_episode(5);
        let context = TemplateContext::new(&metadata, &identifier, None, None);

        assert_eq!(
            template.render(&context).unwrap(),
            PathBuf::from("Show Name/Season 02/Show Name - S02E05 - Pilot_ Part 1")
        );
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let template = PathTemplate::parse("{title}/{resolution}").unwrap();
        assert!(matches!(
            template.validate(MediaType::Movie),
            Err(ScraperError::InvalidConfig(_))
        ));

        let season_only = PathTemplate::parse("{episode}").unwrap();
        assert!(season_only.validate(MediaType::Season).is_err());
    }

    #[test]
    fn test_malformed_templates() {
        assert!(PathTemplate::parse("{title").is_err());
        assert!(PathTemplate::parse("title}").is_err());
        assert!(PathTemplate::parse("{season:xx}").is_err());
        assert!(PathTemplate::parse("{}").is_err());
    }

    #[test]
    fn test_missing_value_is_not_enough_data() {
        let template = PathTemplate::parse("{title} ({year})").unwrap();
        let mut metadata = Metadata::new();
        metadata.set(MetadataField::Title, "Unknown");
        let identifier = Identifier::new(MediaType::Movie, ExternalIds::default());
        let context = TemplateContext::new(&metadata, &identifier, None, None);

        assert!(matches!(
            template.render(&context),
            Err(ScraperError::NotEnoughData(_))
        ));
    }

    #[test]
    fn test_show_year_from_parent() {
        let template = PathTemplate::parse("{show_title} ({show_year})").unwrap();
        let mut season = Metadata::new();
        season.set(MetadataField::ShowTitle, "Show Name");
        let mut show = Metadata::new();
        show.set(MetadataField::Premiered, "2011-04-17");
        let identifier =
            Identifier::new(MediaType::Season, ExternalIds::default()).with_season(1);
        let context = TemplateContext::new(&season, &identifier, Some(&show), None);

        assert_eq!(
            template.render(&context).unwrap(),
            PathBuf::from("Show Name (2011)")
        );
    }
}
