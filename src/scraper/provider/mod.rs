mod fanart;
mod filename;
mod http;
mod nfo;
mod registry;
mod tmdb;
mod traits;

pub use fanart::FanartProvider;
pub use filename::FilenameProvider;
pub use http::HttpClient;
pub use nfo::NfoProvider;
pub use registry::{Pipeline, PluginRegistry};
pub use tmdb::TmdbProvider;
pub use traits::{GuessProvider, IdentifierProvider, ImageProvider, MetadataProvider, Plugin};
