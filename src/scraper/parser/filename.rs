use super::patterns::{PATTERNS, Patterns};
use std::path::Path;

/// Parsed information from a media filename
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMedia {
    /// Cleaned title for searching
    pub title: String,
    /// Release year if found
    pub year: Option<i32>,
    /// Season number
    pub season: Option<u32>,
    /// Episode numbers, more than one for multi-episode files
    pub episodes: Vec<u32>,
    /// Video resolution (e.g., "1080P")
    pub resolution: Option<String>,
    /// Release source (e.g., "`BluRay`", "WEB-DL")
    pub source: Option<String>,
    /// Video codec (e.g., "x265", "HEVC")
    pub codec: Option<String>,
    /// Release group name
    pub release_group: Option<String>,
}

impl ParsedMedia {
    /// Whether the filename carries episode numbering
    #[must_use]
    pub fn is_episode(&self) -> bool {
        !self.episodes.is_empty()
    }
}

pub struct Parser;

impl Parser {
    /// Parse a file path to extract media information
    #[must_use]
    pub fn parse(path: &Path) -> ParsedMedia {
        let filename = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");

        Self::parse_filename(filename)
    }

    /// Parse a filename string directly
    #[must_use]
    pub fn parse_filename(filename: &str) -> ParsedMedia {
        let mut result = ParsedMedia::default();
        let patterns = &*PATTERNS;

        result.release_group = Self::extract_release_group(filename, patterns);

        if let Some(m) = patterns.resolution.find(filename) {
            result.resolution = Some(m.as_str().to_uppercase());
        }

        if let Some(m) = patterns.source.find(filename) {
            result.source = Some(m.as_str().to_string());
        }

        if let Some(m) = patterns.codec.find(filename) {
            result.codec = Some(m.as_str().to_uppercase());
        }

        let (season, episodes, title_end_pos) = Self::extract_episode_info(filename, patterns);
        result.season = season;
        result.episodes = episodes;

        let year = Self::extract_year(filename, title_end_pos, patterns);
        result.year = year.map(|(year, _)| year);
        let title_end_pos = year.map(|(_, pos)| pos).or(title_end_pos);
        result.title = Self::extract_title(filename, title_end_pos, &result, patterns);

        result
    }

    fn extract_release_group(filename: &str, patterns: &Patterns) -> Option<String> {
        // [Group] at the start, skipping hashes and resolutions
        if let Some(group) = patterns
            .release_group_start
            .captures(filename)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            && !patterns.hash.is_match(&format!("[{group}]"))
            && !patterns.resolution.is_match(group)
        {
            return Some(group.to_string());
        }

        // -GROUP at the end, unless the dash belongs to WEB-DL or S01E01-E02
        let caps = patterns.release_group_end.captures(filename)?;
        let dash = caps.get(0)?.start();
        let group = caps.get(1)?.as_str();
        let spans_dash = |m: regex::Match<'_>| m.start() < dash && dash < m.end();
        let inside_tag = patterns.source.find_iter(filename).any(spans_dash)
            || patterns.season_episode.find_iter(filename).any(spans_dash);
        let numeric = group.chars().all(|c| c.is_ascii_digit());

        (!inside_tag && !numeric && !patterns.resolution.is_match(group))
            .then(|| group.to_string())
    }

    fn extract_episode_info(
        filename: &str,
        patterns: &Patterns,
    ) -> (Option<u32>, Vec<u32>, Option<usize>) {
        // S01E01, possibly followed by more episodes
        if let Some(caps) = patterns.season_episode.captures(filename) {
            let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let episodes = caps
                .get(2)
                .map(|run| {
                    patterns
                        .episode_in_run
                        .captures_iter(run.as_str())
                        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
                        .collect()
                })
                .unwrap_or_default();
            let pos = caps.get(0).map(|m| m.start());
            return (season, episodes, pos);
        }

        if let Some(caps) = patterns.season_x_episode.captures(filename) {
            let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
            let pos = caps.get(0).map(|m| m.start());
            return (season, episode.into_iter().collect(), pos);
        }

        // Absolute numbering implies season 1
        for pattern in [
            &patterns.episode_dash,
            &patterns.episode_only,
            &patterns.episode_bracket,
        ] {
            if let Some(caps) = pattern.captures(filename) {
                let episode = caps.get(1).and_then(|m| m.as_str().parse().ok());
                let pos = caps.get(0).map(|m| m.start());
                return (Some(1), episode.into_iter().collect(), pos);
            }
        }

        (None, Vec::new(), None)
    }

    /// Last plausible year before the episode marker and the first release
    /// tag, with the byte offset where it starts. A year opening the name is
    /// part of the title.
    fn extract_year(
        filename: &str,
        episode_pos: Option<usize>,
        patterns: &Patterns,
    ) -> Option<(i32, usize)> {
        let limit = [&patterns.resolution, &patterns.source, &patterns.codec]
            .into_iter()
            .filter_map(|pattern| pattern.find(filename).map(|m| m.start()))
            .chain(episode_pos)
            .min()
            .unwrap_or(filename.len());
        let plausible = |start: usize, year: &str| {
            year.parse::<i32>()
                .ok()
                .filter(|year| start > 0 && start < limit && (1900..=2099).contains(year))
                .map(|year| (year, start))
        };

        // Prefer year in parentheses
        let in_parens = patterns
            .year_in_parens
            .captures_iter(filename)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                plausible(whole.start(), caps.get(1)?.as_str())
            })
            .last();

        in_parens.or_else(|| {
            patterns
                .year
                .find_iter(filename)
                .filter_map(|m| plausible(m.start(), m.as_str()))
                .last()
        })
    }

    fn extract_title(
        filename: &str,
        title_end_pos: Option<usize>,
        result: &ParsedMedia,
        patterns: &Patterns,
    ) -> String {
        let mut title = filename.to_string();

        if let Some(pos) = title_end_pos {
            title.truncate(pos);
        }

        if patterns.release_group_start.is_match(&title) {
            title = patterns.release_group_start.replace(&title, "").to_string();
        }
        if result.release_group.is_some() {
            title = patterns.release_group_end.replace(&title, "").to_string();
        }

        title = patterns.brackets.replace_all(&title, " ").to_string();
        title = patterns.resolution.replace_all(&title, " ").to_string();
        title = patterns.source.replace_all(&title, " ").to_string();
        title = patterns.codec.replace_all(&title, " ").to_string();

        title = title.replace(['.', '_', '-'], " ");

        title.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_movie() {
        let path = PathBuf::from("The.Matrix.1999.1080p.BluRay.x264.mkv");
        let info = Parser::parse(&path);
        assert_eq!(info.title, "The Matrix");
        assert_eq!(info.year, Some(1999));
        assert_eq!(info.resolution, Some("1080P".to_string()));
        assert!(!info.is_episode());
    }

    #[test]
    fn test_parse_multi_episode() {
        let info = Parser::parse_filename("Show.Name.S01E01E02.720p");
        assert_eq!(info.title, "Show Name");
        assert_eq!(info.season, Some(1));
        assert_eq!(info.episodes, vec![1, 2]);

        let dashed = Parser::parse_filename("Show.Name.S03E07-E08");
        assert_eq!(dashed.episodes, vec![7, 8]);
    }

    #[test]
    fn test_release_group_at_end() {
        let info = Parser::parse_filename("The.Matrix.1999.1080p.BluRay.x264-GROUP");
        assert_eq!(info.release_group.as_deref(), Some("GROUP"));
        assert_eq!(info.source.as_deref(), Some("BluRay"));
        assert_eq!(info.title, "The Matrix");
    }

    #[test]
    fn test_source_dash_is_not_a_group() {
        let info = Parser::parse_filename("Some.Movie.2020.WEB-DL");
        assert_eq!(info.release_group, None);
        assert_eq!(info.source.as_deref(), Some("WEB-DL"));
    }

    #[test]
    fn test_parse_anime_with_group() {
        let path = PathBuf::from("[SubsPlease] Frieren - 01 (1080p) [ABCD1234].mkv");
        let info = Parser::parse(&path);
        assert_eq!(info.title, "Frieren");
        assert_eq!(info.season, Some(1));
        assert_eq!(info.episodes, vec![1]);
        assert_eq!(info.release_group, Some("SubsPlease".to_string()));
    }

    #[test]
    fn test_parse_movie_with_parens_year() {
        let path = PathBuf::from("Inception (2010) 2160p UHD BluRay.mkv");
        let info = Parser::parse(&path);
        assert_eq!(info.title, "Inception");
        assert_eq!(info.year, Some(2010));
        assert!(!info.is_episode());
    }

    #[test]
    fn test_leading_number_stays_in_title() {
        let info = Parser::parse_filename("2001.A.Space.Odyssey.1968.1080p.BluRay");
        assert_eq!(info.title, "2001 A Space Odyssey");
        assert_eq!(info.year, Some(1968));

        let bare = Parser::parse_filename("1917");
        assert_eq!(bare.title, "1917");
        assert_eq!(bare.year, None);
    }

    #[test]
    fn test_last_year_is_the_release_year() {
        let info = Parser::parse_filename("Blade.Runner.2049.2017.2160p.WEB-DL");
        assert_eq!(info.title, "Blade Runner 2049");
        assert_eq!(info.year, Some(2017));
    }

    #[test]
    fn test_show_year_is_cut_from_episode_title() {
        let info = Parser::parse_filename("Doctor.Who.2005.S01E01.720p.HDTV");
        assert_eq!(info.title, "Doctor Who");
        assert_eq!(info.year, Some(2005));
        assert_eq!(info.season, Some(1));
        assert_eq!(info.episodes, vec![1]);

        let aired = Parser::parse_filename("Show.Name.S01E02.2019.720p");
        assert_eq!(aired.title, "Show Name");
        assert_eq!(aired.year, None);
    }
}
