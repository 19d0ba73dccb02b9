mod cache;
mod downloader;
mod guess;
mod identifier;
mod matcher;
mod organizer;
mod parser;
mod provider;
mod resolver;
mod scanner;
mod template;
mod types;
mod writer;


pub use cache::{CacheStats, IdentifierCache, ScraperCache};
pub use downloader::{DownloadOutcome, Downloader};
pub use guess::aggregate_guess;
pub use identifier::resolve_identifier;
pub use matcher::{CandidateSelector, Confidence, Disambiguation, Matcher, ScoredMatch, Selection};
pub use organizer::{BatchReport, OrganizeMethod, SortOutcome, Sorter};
pub use parser::{ParsedMedia, Parser};
pub use provider::{
    FanartProvider, FilenameProvider, GuessProvider, HttpClient, IdentifierProvider,
    ImageProvider, MetadataProvider, NfoProvider, Pipeline, Plugin, PluginRegistry, TmdbProvider,
};
pub use resolver::{MetadataResolver, ProviderTable};
pub use scanner::Scanner;
pub use template::{PathTemplate, TemplateContext};
pub use types::{
    Candidate, ExternalIds, Guess, IdType, Identifier, ImageSet, ImageType, MediaType, Metadata,
    MetadataField, MetadataValue, PartialGuess, Person,
};
pub use writer::{NfoSource, NfoWriter};

/// Scraper result type
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Scraper error types
#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Not enough data: {0}")]
    NotEnoughData(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid plugin: {0}")]
    InvalidPlugin(String),

    #[error("Aborted by user")]
    Aborted,

    #[error("Media type {0} cannot be sorted directly")]
    InvalidMediaType(MediaType),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
}

impl ScraperError {
    /// Recoverable outcome for a single file: the batch skips it and goes on
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::NotEnoughData(_) | Self::Aborted | Self::InvalidMediaType(_) | Self::NotFound(_)
        )
    }
}
