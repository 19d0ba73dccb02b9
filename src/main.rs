use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use reelsort::config::Settings;
use reelsort::logging;
use reelsort::scraper::{
    Candidate, CandidateSelector, Disambiguation, MediaType, PluginRegistry, Scanner,
    ScraperCache, Selection, Sorter,
};

/// Identify movies and episodes, fetch their metadata and sort them into a library.
#[derive(Parser)]
#[command(name = "reelsort", version, about)]
struct Cli {
    /// Configuration file (defaults to <config dir>/reelsort/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    /// Treat every file as this media type (movie or episode)
    #[arg(short = 't', long = "force-type")]
    force_type: Option<MediaType>,

    /// Ask which search result to use when there are several
    #[arg(short, long)]
    interactive: bool,

    /// Log what would be done without touching the filesystem
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Video file or directory to sort
    #[arg(required_unless_present = "print_config")]
    source: Option<PathBuf>,
}

/// Numbered prompt on stdin; a single candidate is taken without asking
struct PromptSelector;

impl CandidateSelector for PromptSelector {
    fn select(&self, candidates: &[Candidate], media_type: MediaType) -> Selection {
        if candidates.len() == 1 {
            return Selection::Chosen(0);
        }

        println!("Several {media_type} candidates found:");
        for (index, candidate) in candidates.iter().enumerate() {
            println!("  {}) {}", index + 1, candidate.display_title());
        }

        let stdin = io::stdin();
        loop {
            print!("Choose 1-{} (enter for 1, q to skip this file): ", candidates.len());
            let _ = io::stdout().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return Selection::Abort,
                Ok(_) => {}
            }

            let answer = line.trim();
            if answer.is_empty() {
                return Selection::Chosen(0);
            }
            if answer.eq_ignore_ascii_case("q") {
                return Selection::Abort;
            }
            match answer.parse::<usize>() {
                Ok(choice) if (1..=candidates.len()).contains(&choice) => {
                    return Selection::Chosen(choice - 1);
                }
                _ => println!("Invalid choice '{answer}'"),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if cli.dry_run {
        settings.general.dry_run = true;
    }

    if cli.print_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    let _guard = logging::init(cli.verbose, settings.general.log_dir.as_deref())?;

    let source = cli.source.context("SOURCE is required")?;
    if !source.exists() {
        anyhow::bail!("{} does not exist", source.display());
    }

    let cache = ScraperCache::new();
    let registry = PluginRegistry::from_settings(&settings, &cache).await?;
    let disambiguation = if cli.interactive {
        Disambiguation::Select(Arc::new(PromptSelector))
    } else {
        Disambiguation::BestMatch
    };
    let sorter = Sorter::new(&settings, &registry, cache, disambiguation, cli.force_type)?;

    let scanner = Scanner::new(
        &settings.videofiles.allowed_extensions,
        settings.videofiles.minimal_file_size,
    );
    let files = scanner.scan(&source);
    info!("Found {} video files in {}", files.len(), source.display());

    let report = sorter.sort_all(&files).await;
    println!(
        "{} sorted, {} skipped, {} aborted, {} failed",
        report.sorted, report.skipped, report.aborted, report.failed
    );

    Ok(())
}
