//! Sorting of video files into the library: guess, identify, resolve, then
//! place the media together with its sidecars and artwork.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{MediaPathSettings, Settings};

use super::{
    Downloader, NfoSource, NfoWriter, Result, ScraperError,
    cache::ScraperCache,
    guess::aggregate_guess,
    identifier::resolve_identifier,
    matcher::Disambiguation,
    provider::{Pipeline, PluginRegistry},
    template::{PathTemplate, TemplateContext},
    types::{Guess, Identifier, ImageSet, ImageType, MediaType, Metadata},
};

/// How the media file gets into the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrganizeMethod {
    /// Move files
    #[default]
    Move,
    /// Copy files
    Copy,
    /// Create hard links (same filesystem only)
    Hardlink,
    /// Create symbolic links
    Symlink,
}

impl std::fmt::Display for OrganizeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Copy => write!(f, "copy"),
            Self::Hardlink => write!(f, "hardlink"),
            Self::Symlink => write!(f, "symlink"),
        }
    }
}

impl std::str::FromStr for OrganizeMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "move" | "mv" => Ok(Self::Move),
            "copy" | "cp" => Ok(Self::Copy),
            "hardlink" | "hard" => Ok(Self::Hardlink),
            "symlink" | "sym" | "soft" => Ok(Self::Symlink),
            _ => Err(format!("Unknown method: {s}")),
        }
    }
}

/// Result of sorting a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    /// Placed (or, in a dry run, would have been placed) at `destination`
    Sorted { source: PathBuf, destination: PathBuf },
    /// Destination already taken
    Skipped { source: PathBuf, destination: PathBuf },
}

/// Counters of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub sorted: usize,
    pub skipped: usize,
    pub aborted: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.sorted + self.skipped + self.aborted + self.failed
    }
}

/// Parsed path templates of one media type
struct MediaPaths {
    base: PathBuf,
    media: Option<PathTemplate>,
    nfo: Option<PathTemplate>,
    images: Vec<(ImageType, PathTemplate)>,
}

impl MediaPaths {
    fn from_settings(media_type: MediaType, settings: &MediaPathSettings) -> Result<Self> {
        let parse = |template: &str| -> Result<PathTemplate> {
            let template = PathTemplate::parse(template)?;
            template.validate(media_type)?;
            Ok(template)
        };

        let media = settings.media.as_deref().map(parse).transpose()?;
        let nfo = settings.nfo.as_deref().map(parse).transpose()?;

        let mut images = Vec::new();
        for (key, template) in &settings.images {
            let image_type: ImageType = key.parse().map_err(|e| {
                ScraperError::InvalidConfig(format!("paths.{media_type}.images.{key}: {e}"))
            })?;
            if !media_type.image_types().contains(&image_type) {
                return Err(ScraperError::InvalidConfig(format!(
                    "paths.{media_type}.images.{key}: {media_type} has no {image_type} image"
                )));
            }
            images.push((image_type, parse(template)?));
        }

        Ok(Self {
            base: settings.base.clone(),
            media,
            nfo,
            images,
        })
    }
}

/// One resolved media entity of a file: the media itself or a successor
struct Entity {
    identifier: Identifier,
    metadata: Arc<Metadata>,
    images: Arc<ImageSet>,
}

/// Rendered destinations of one entity
#[derive(Default)]
struct Destinations {
    media: Option<PathBuf>,
    nfo: Option<PathBuf>,
    /// (image URL, destination without extension)
    artwork: Vec<(String, PathBuf)>,
}

/// Sorts video files into the library
pub struct Sorter {
    pipeline: Pipeline,
    disambiguation: Disambiguation,
    forced_type: Option<MediaType>,
    method: OrganizeMethod,
    dry_run: bool,
    overwrite_media: bool,
    paths: HashMap<MediaType, MediaPaths>,
    downloader: Downloader,
    writer: NfoWriter,
    /// Show-level sidecars already handled in this run
    sidecars: Mutex<HashSet<PathBuf>>,
}

impl Sorter {
    /// Wire up providers and path templates. Every configuration problem
    /// surfaces here rather than while sorting.
    pub fn new(
        settings: &Settings,
        registry: &PluginRegistry,
        cache: ScraperCache,
        disambiguation: Disambiguation,
        forced_type: Option<MediaType>,
    ) -> Result<Self> {
        if let Some(media_type) = forced_type
            && !MediaType::GUESSABLE.contains(&media_type)
        {
            return Err(ScraperError::InvalidMediaType(media_type));
        }

        let method: OrganizeMethod = settings
            .general
            .organize_method
            .parse()
            .map_err(|e| ScraperError::InvalidConfig(format!("general.organize_method: {e}")))?;

        let pipeline = Pipeline::from_settings(
            &settings.plugins,
            &settings.general.languages,
            registry,
            cache,
        )?;

        let mut paths = HashMap::new();
        for media_type in [
            MediaType::Movie,
            MediaType::TvShow,
            MediaType::Season,
            MediaType::Episode,
        ] {
            let media_paths =
                MediaPaths::from_settings(media_type, settings.paths.for_type(media_type))?;
            if MediaType::GUESSABLE.contains(&media_type) && media_paths.media.is_none() {
                return Err(ScraperError::InvalidConfig(format!(
                    "paths.{media_type}.media must be set"
                )));
            }
            paths.insert(media_type, media_paths);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("reelsort/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;
        let dry_run = settings.general.dry_run;

        Ok(Self {
            pipeline,
            disambiguation,
            forced_type,
            method,
            dry_run,
            overwrite_media: settings.overwrite.media,
            paths,
            downloader: Downloader::new(client, settings.overwrite.images, dry_run),
            writer: NfoWriter::new(settings.overwrite.nfo, dry_run),
            sidecars: Mutex::new(HashSet::new()),
        })
    }

    /// Sort every file in order, one at a time
    pub async fn sort_all(&self, paths: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();

        for path in paths {
            match self.sort(path).await {
                Ok(SortOutcome::Sorted { .. }) => report.sorted += 1,
                Ok(SortOutcome::Skipped { .. }) => report.skipped += 1,
                Err(ScraperError::Aborted) => {
                    info!("Aborted {}", path.display());
                    report.aborted += 1;
                }
                Err(e) if e.is_skip() => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.skipped += 1;
                }
                Err(e) => {
                    error!("Failed to sort {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Sort complete: {} sorted, {} skipped, {} aborted, {} failed",
            report.sorted, report.skipped, report.aborted, report.failed
        );

        report
    }

    /// Sort a single file
    pub async fn sort(&self, path: &Path) -> Result<SortOutcome> {
        info!("Processing {}", path.display());

        let guess = aggregate_guess(path, &self.pipeline.guess, self.forced_type).await?;
        let media_type = guess.media_type;

        let identifier = resolve_identifier(
            &guess,
            self.pipeline.identifiers(media_type),
            self.pipeline.required_ids(media_type),
            &self.disambiguation,
        )
        .await?;

        let entities = self.resolve_entities(&identifier).await?;
        let show = entities
            .iter()
            .find(|entity| entity.identifier.media_type == MediaType::TvShow)
            .map(|entity| Arc::clone(&entity.metadata));

        let ext = guess.extension();
        let mut planned = Vec::with_capacity(entities.len());
        for entity in &entities {
            let own = entity.identifier.media_type == media_type;
            let destinations = self.render(
                entity,
                show.as_deref(),
                if own { ext.as_deref() } else { None },
            )?;
            planned.push((entity, destinations));
        }

        let destination = planned
            .iter()
            .find_map(|(entity, destinations)| {
                (entity.identifier.media_type == media_type)
                    .then(|| destinations.media.clone())
                    .flatten()
            })
            .ok_or_else(|| {
                ScraperError::NotEnoughData(format!("no media path rendered for {identifier}"))
            })?;

        if same_file(path, &destination) {
            info!("{} is already in place", path.display());
            return Ok(SortOutcome::Skipped {
                source: path.to_path_buf(),
                destination,
            });
        }
        if !self.overwrite_media && destination.exists() {
            warn!(
                "Not sorting {}: {} already exists",
                path.display(),
                destination.display()
            );
            return Ok(SortOutcome::Skipped {
                source: path.to_path_buf(),
                destination,
            });
        }

        self.create_dirs(&planned)?;

        for (entity, destinations) in &planned {
            if let Some(nfo) = &destinations.nfo {
                let own = entity.identifier.media_type == media_type;
                self.write_sidecar(entity, nfo, own.then_some(&guess)).await;
            }
            for (url, stem) in &destinations.artwork {
                if let Err(e) = self.downloader.download_image(url, stem).await {
                    warn!("Failed to download {}: {:#}", url, e);
                }
            }
        }

        if self.dry_run {
            info!(
                "Would {} {} -> {}",
                self.method,
                path.display(),
                destination.display()
            );
        } else {
            perform_organize(self.method, path, &destination, self.overwrite_media)?;
            info!(
                "{} {} -> {}",
                self.method,
                path.display(),
                destination.display()
            );
        }

        Ok(SortOutcome::Sorted {
            source: path.to_path_buf(),
            destination,
        })
    }

    /// The media itself last, after the show and season it belongs to
    async fn resolve_entities(&self, identifier: &Identifier) -> Result<Vec<Entity>> {
        let mut entities = Vec::new();

        for &successor in identifier.media_type.successors() {
            entities.push(self.resolve_entity(identifier.successor(successor)).await?);
        }
        entities.push(self.resolve_entity(identifier.clone()).await?);

        Ok(entities)
    }

    async fn resolve_entity(&self, identifier: Identifier) -> Result<Entity> {
        let metadata = self.pipeline.resolver.metadata(&identifier).await?;
        let images = self.pipeline.resolver.images(&identifier).await?;
        debug!(
            "Resolved {}: {} fields, {} images",
            identifier,
            metadata.len(),
            images.len()
        );

        Ok(Entity {
            identifier,
            metadata,
            images,
        })
    }

    fn render(
        &self,
        entity: &Entity,
        show: Option<&Metadata>,
        ext: Option<&str>,
    ) -> Result<Destinations> {
        let Some(paths) = self.paths.get(&entity.identifier.media_type) else {
            return Ok(Destinations::default());
        };

        let context = TemplateContext::new(&entity.metadata, &entity.identifier, show, ext);
        let render = |template: &PathTemplate| -> Result<PathBuf> {
            Ok(paths.base.join(template.render(&context)?))
        };

        let mut destinations = Destinations {
            media: if ext.is_some() {
                paths.media.as_ref().map(render).transpose()?
            } else {
                None
            },
            nfo: paths.nfo.as_ref().map(render).transpose()?,
            artwork: Vec::new(),
        };

        for (image_type, template) in &paths.images {
            if let Some(url) = entity.images.get(*image_type) {
                destinations.artwork.push((url.to_string(), render(template)?));
            }
        }

        Ok(destinations)
    }

    fn create_dirs(&self, planned: &[(&Entity, Destinations)]) -> Result<()> {
        let dirs: BTreeSet<&Path> = planned
            .iter()
            .flat_map(|(_, destinations)| {
                destinations
                    .media
                    .iter()
                    .chain(destinations.nfo.iter())
                    .chain(destinations.artwork.iter().map(|(_, stem)| stem))
            })
            .filter_map(|path| path.parent())
            .collect();

        for dir in dirs {
            if dir.is_dir() {
                continue;
            }
            if self.dry_run {
                info!("Would create {}", dir.display());
            } else {
                fs::create_dir_all(dir)?;
                debug!("Created {}", dir.display());
            }
        }

        Ok(())
    }

    async fn write_sidecar(&self, entity: &Entity, path: &Path, guess: Option<&Guess>) {
        let shared = entity.identifier.media_type != MediaType::Movie
            && entity.identifier.media_type != MediaType::Episode;
        if shared && !self.sidecars.lock().insert(path.to_path_buf()) {
            debug!("Sidecar {} already handled in this run", path.display());
            return;
        }

        let source = NfoSource {
            identifier: &entity.identifier,
            metadata: &entity.metadata,
            images: &entity.images,
            guess,
        };
        if let Err(e) = self.writer.write(path, &source).await {
            error!("Failed to write {}: {:#}", path.display(), e);
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(unix)]
fn create_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn create_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Place `source` at `target`
fn perform_organize(
    method: OrganizeMethod,
    source: &Path,
    target: &Path,
    overwrite: bool,
) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    if target.symlink_metadata().is_ok() {
        if !overwrite {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            ));
        }
        fs::remove_file(target)?;
    }

    match method {
        OrganizeMethod::Symlink => {
            let abs_source = if source.is_absolute() {
                source.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(source))
                    .unwrap_or_else(|_| source.to_path_buf())
            };
            create_symlink(&abs_source, target)
        }
        OrganizeMethod::Hardlink => fs::hard_link(source, target),
        OrganizeMethod::Move => match fs::rename(source, target) {
            Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
                fs::copy(source, target)?;
                fs::remove_file(source)
            }
            result => result,
        },
        OrganizeMethod::Copy => fs::copy(source, target).map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source_file(dir: &TempDir) -> PathBuf {
        let source = dir.path().join("incoming").join("Movie.2020.mkv");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"video").unwrap();
        source
    }

    #[test]
    fn test_organize_method_parse() {
        assert_eq!("move".parse::<OrganizeMethod>().unwrap(), OrganizeMethod::Move);
        assert_eq!("cp".parse::<OrganizeMethod>().unwrap(), OrganizeMethod::Copy);
        assert_eq!("hard".parse::<OrganizeMethod>().unwrap(), OrganizeMethod::Hardlink);
        assert_eq!("Symlink".parse::<OrganizeMethod>().unwrap(), OrganizeMethod::Symlink);
        assert!("teleport".parse::<OrganizeMethod>().is_err());
        assert_eq!(OrganizeMethod::default(), OrganizeMethod::Move);
    }

    #[test]
    fn test_move_and_copy() {
        let dir = TempDir::new().unwrap();
        let source = source_file(&dir);
        let copied = dir.path().join("library").join("a").join("Movie (2020).mkv");

        perform_organize(OrganizeMethod::Copy, &source, &copied, false).unwrap();
        assert!(source.exists());
        assert_eq!(fs::read(&copied).unwrap(), b"video");

        let moved = dir.path().join("library").join("b").join("Movie (2020).mkv");
        perform_organize(OrganizeMethod::Move, &source, &moved, false).unwrap();
        assert!(!source.exists());
        assert!(moved.exists());
    }

    #[test]
    fn test_existing_target_needs_overwrite() {
        let dir = TempDir::new().unwrap();
        let source = source_file(&dir);
        let target = dir.path().join("target.mkv");
        fs::write(&target, b"old").unwrap();

        let err = perform_organize(OrganizeMethod::Copy, &source, &target, false).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&target).unwrap(), b"old");

        perform_organize(OrganizeMethod::Copy, &source, &target, true).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"video");
    }

    #[cfg(unix)]
    #[test]
    fn test_links() {
        let dir = TempDir::new().unwrap();
        let source = source_file(&dir);

        let hard = dir.path().join("hard.mkv");
        perform_organize(OrganizeMethod::Hardlink, &source, &hard, false).unwrap();
        assert_eq!(fs::read(&hard).unwrap(), b"video");

        let soft = dir.path().join("soft.mkv");
        perform_organize(OrganizeMethod::Symlink, &source, &soft, false).unwrap();
        assert!(fs::symlink_metadata(&soft).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&soft).unwrap(), source);
    }

    #[test]
    fn test_image_keys_are_checked() {
        let mut settings = MediaPathSettings {
            base: PathBuf::from("/library"),
            media: Some("{title}.{ext}".to_string()),
            ..MediaPathSettings::default()
        };
        settings
            .images
            .insert("thumbnail".to_string(), "{title}-thumb".to_string());

        assert!(matches!(
            MediaPaths::from_settings(MediaType::Movie, &settings),
            Err(ScraperError::InvalidConfig(_))
        ));
        assert!(MediaPaths::from_settings(MediaType::Episode, &settings).is_ok());

        settings.images.clear();
        settings.nfo = Some("{title}/{budget}.nfo".to_string());
        assert!(matches!(
            MediaPaths::from_settings(MediaType::Movie, &settings),
            Err(ScraperError::InvalidConfig(_))
        ));
    }
}
