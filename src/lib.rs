//! Identify video files, fetch their metadata and artwork and sort them into
//! a media library.

pub mod config;
pub mod logging;
pub mod scraper;
