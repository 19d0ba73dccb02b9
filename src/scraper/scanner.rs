use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const MIB: u64 = 1024 * 1024;

/// Scanner for finding video files to sort
#[derive(Debug, Clone)]
pub struct Scanner {
    /// Lowercased extensions without the dot
    extensions: Vec<String>,
    /// Minimum file size in bytes
    min_size: u64,
}

impl Scanner {
    /// `min_size_mib` is in MiB; 0 disables the size check
    pub fn new<S: AsRef<str>>(extensions: &[S], min_size_mib: u64) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            min_size: min_size_mib.saturating_mul(MIB),
        }
    }

    /// Walk a directory (or take a single file) and return matching videos,
    /// sorted by path.
    pub fn scan<P: AsRef<Path>>(&self, path: P) -> Vec<PathBuf> {
        let mut video_files: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.accepts(entry.path(), entry.metadata().ok().map(|m| m.len())))
            .map(|entry| entry.into_path())
            .collect();

        video_files.sort();
        video_files
    }

    fn accepts(&self, path: &Path, size: Option<u64>) -> bool {
        let extension_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)));
        if !extension_ok {
            return false;
        }

        let size = size.unwrap_or(0);
        if size < self.min_size {
            debug!(
                "Skipping {}: {} bytes is below the minimal size",
                path.display(),
                size
            );
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::Scanner;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn scanner() -> Scanner {
        Scanner::new(&["mkv", "MP4"], 0)
    }

    #[test]
    fn test_scan_finds_video_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();

        File::create(dir_path.join("movie.mkv")).unwrap();
        File::create(dir_path.join("show.MP4")).unwrap();
        File::create(dir_path.join("document.txt")).unwrap();

        let results = scanner().scan(dir_path);

        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|p| p.extension().unwrap() == "mkv"));
        assert!(results.iter().any(|p| p.extension().unwrap() == "MP4"));
    }

    #[test]
    fn test_scan_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();

        let subdir = dir_path.join("Season 1");
        fs::create_dir(&subdir).unwrap();

        File::create(dir_path.join("movie.mkv")).unwrap();
        File::create(subdir.join("episode.mkv")).unwrap();

        let results = scanner().scan(dir_path);

        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_scan_minimal_size() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();

        fs::write(dir_path.join("sample.mkv"), vec![0u8; 1024]).unwrap();
        fs::write(dir_path.join("movie.mkv"), vec![0u8; 2 * 1024 * 1024]).unwrap();

        let results = Scanner::new(&["mkv"], 1).scan(dir_path);

        assert_eq!(results.len(), 1);
        assert!(results[0].ends_with("movie.mkv"));
    }

    #[test]
    fn test_scan_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("movie.mkv");
        File::create(&file).unwrap();

        assert_eq!(scanner().scan(&file), vec![file]);
    }
}
