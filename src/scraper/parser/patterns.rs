use regex::Regex;
use std::sync::LazyLock;

/// Pre-compiled regex patterns for filename parsing
pub struct Patterns {
    pub year: Regex,
    pub year_in_parens: Regex,

    // Episode patterns (ordered by specificity)
    pub season_episode: Regex,   // S01E01, s1e1, S01E01E02, S01E01-E02
    pub episode_in_run: Regex,   // E02 inside a multi-episode run
    pub season_x_episode: Regex, // 1x01
    pub episode_only: Regex,     // E01, Ep01, EP01
    pub episode_dash: Regex,     // - 01, - 01v2
    pub episode_bracket: Regex,  // [01], [01v2]

    pub resolution: Regex,
    pub source: Regex,
    pub codec: Regex,

    pub release_group_start: Regex, // [GroupName]
    pub release_group_end: Regex,   // -GROUP at end

    pub brackets: Regex,
    pub hash: Regex, // [ABCD1234] CRC32 hash
}

impl Patterns {
    pub fn new() -> Self {
        Self {
            // Year: 1900-2099
            year: Regex::new(r"\b(19|20)\d{2}\b").expect("Invalid year regex"),
            year_in_parens: Regex::new(r"\((\d{4})\)").expect("Invalid year_in_parens regex"),

            season_episode: Regex::new(r"(?i)S(\d{1,2})((?:[-_. ]?E\d{1,3})+)")
                .expect("Invalid season_episode regex"),
            episode_in_run: Regex::new(r"(?i)E(\d{1,3})").expect("Invalid episode_in_run regex"),
            season_x_episode: Regex::new(r"\b(\d{1,2})[xX](\d{1,3})\b")
                .expect("Invalid season_x_episode regex"),
            episode_only: Regex::new(r"(?i)\b(?:E|EP)\.?(\d{1,3})\b")
                .expect("Invalid episode_only regex"),
            episode_dash: Regex::new(r"[-–]\s*(\d{2,3})(?:v\d)?(?:\s|$|\[)")
                .expect("Invalid episode_dash regex"),
            episode_bracket: Regex::new(r"\[(\d{2,3})(?:v\d)?\]")
                .expect("Invalid episode_bracket regex"),

            resolution: Regex::new(r"(?i)(480p|576p|720p|1080p|2160p|4[kK]|UHD)")
                .expect("Invalid resolution regex"),
            source: Regex::new(
                r"(?i)(HDTV|WEB[-.]?DL|WEB[-.]?Rip|BluRay|BDRip|BRRip|DVDRip|HDCAM|DVDScr|DVDR|Remux)",
            )
            .expect("Invalid source regex"),
            codec: Regex::new(r"(?i)(x264|x265|H\.?264|H\.?265|HEVC|AVC|XviD|DivX|VP9|AV1)")
                .expect("Invalid codec regex"),

            release_group_start: Regex::new(r"^\[([^\]]+)\]")
                .expect("Invalid release_group_start regex"),
            release_group_end: Regex::new(r"-([A-Za-z0-9]+)$")
                .expect("Invalid release_group_end regex"),

            brackets: Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}")
                .expect("Invalid brackets regex"),
            hash: Regex::new(r"\[[A-Fa-f0-9]{8}\]").expect("Invalid hash regex"),
        }
    }
}

impl Default for Patterns {
    fn default() -> Self {
        Self::new()
    }
}

pub static PATTERNS: LazyLock<Patterns> = LazyLock::new(Patterns::new);
