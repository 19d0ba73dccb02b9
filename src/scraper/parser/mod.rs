mod filename;
mod patterns;

pub use filename::{ParsedMedia, Parser};

#[cfg(test)]
mod test {
    use crate::scraper::parser::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_parse_standard_movie() {
        let path = PathBuf::from("The.Matrix.1999.mkv");
        let info = Parser::parse(&path);

        assert_eq!(info.title, "The Matrix");
        assert_eq!(info.year, Some(1999));
        assert!(info.episodes.is_empty());
        assert!(info.release_group.is_none());
    }

    #[test]
    fn test_parse_tv_show_sxxexx() {
        let path = PathBuf::from("Show.Name.S02E05.mkv");
        let info = Parser::parse(&path);

        assert_eq!(info.title, "Show Name");
        assert_eq!(info.season, Some(2));
        assert_eq!(info.episodes, vec![5]);
        assert_eq!(info.year, None);
    }

    #[test]
    fn test_parse_tv_show_lowercase() {
        let path = PathBuf::from("game.of.thrones.s08e06.1080p.mkv");
        let info = Parser::parse(&path);

        assert_eq!(info.title, "game of thrones");
        assert_eq!(info.season, Some(8));
        assert_eq!(info.episodes, vec![6]);
    }

    #[test]
    fn test_parse_tv_show_x_format() {
        let path = PathBuf::from("Friends.1x01.The.One.Where.Monica.Gets.a.Roommate.mkv");
        let info = Parser::parse(&path);

        assert_eq!(info.title, "Friends");
        assert_eq!(info.season, Some(1));
        assert_eq!(info.episodes, vec![1]);
    }

    #[test]
    fn test_parse_anime_with_version() {
        let path = PathBuf::from("[Erai-raws] Jujutsu Kaisen - 01v2 [1080p].mkv");
        let info = Parser::parse(&path);

        assert_eq!(info.episodes, vec![1]);
        assert_eq!(info.release_group, Some("Erai-raws".to_string()));
        assert_eq!(info.title, "Jujutsu Kaisen");
    }

    #[test]
    fn test_multi_episode_dash_is_not_a_group() {
        let info = Parser::parse_filename("Show.Name.S03E07-E08");

        assert_eq!(info.episodes, vec![7, 8]);
        assert_eq!(info.release_group, None);
    }

    #[test]
    fn test_parse_extracts_codec() {
        let path = PathBuf::from("Movie.2023.2160p.UHD.BluRay.x265.HEVC.mkv");
        let info = Parser::parse(&path);

        let codec = info.codec.unwrap();
        assert!(codec.contains("X265") || codec.contains("HEVC"));
    }
}
