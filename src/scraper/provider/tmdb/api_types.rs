use serde::{Deserialize, Serialize};

// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationResponse {
    pub images: ImageConfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfiguration {
    pub base_url: String,
    pub secure_base_url: String,
    #[serde(default)]
    pub poster_sizes: Vec<String>,
    #[serde(default)]
    pub backdrop_sizes: Vec<String>,
    #[serde(default)]
    pub still_sizes: Vec<String>,
}

/// Configuration as stored in the on-disk cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedConfiguration {
    pub fetched: chrono::DateTime<chrono::Utc>,
    pub configuration: ConfigurationResponse,
}

// Search responses
#[derive(Debug, Deserialize)]
pub struct SearchResponse<T> {
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct MovieResult {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TvResult {
    pub id: i64,
    pub name: String,
    pub original_name: Option<String>,
    pub first_air_date: Option<String>,
    pub overview: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeResult {
    pub show_id: i64,
}

// Detail responses
#[derive(Debug, Deserialize)]
pub struct MovieDetails {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub tagline: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub belongs_to_collection: Option<Collection>,
    #[serde(default)]
    pub genres: Vec<Named>,
    #[serde(default)]
    pub production_companies: Vec<Named>,
    #[serde(default)]
    pub production_countries: Vec<Named>,
    pub credits: Option<Credits>,
    pub release_dates: Option<CountryResults<ReleaseDates>>,
}

#[derive(Debug, Deserialize)]
pub struct TvDetails {
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub created_by: Vec<Named>,
    #[serde(default)]
    pub genres: Vec<Named>,
    #[serde(default)]
    pub networks: Vec<Named>,
    #[serde(default)]
    pub production_companies: Vec<Named>,
    pub credits: Option<Credits>,
    pub content_ratings: Option<CountryResults<ContentRating>>,
    pub images: Option<Images>,
}

#[derive(Debug, Deserialize)]
pub struct SeasonDetails {
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub poster_path: Option<String>,
    pub images: Option<Images>,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeDetails {
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub still_path: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
    #[serde(default)]
    pub guest_stars: Vec<CastMember>,
}

// Common types
#[derive(Debug, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Collection {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExternalIds {
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
    pub order: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CrewMember {
    pub name: String,
    pub job: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CountryResults<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseDates {
    pub iso_3166_1: String,
    #[serde(default)]
    pub release_dates: Vec<ReleaseDate>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseDate {
    #[serde(default)]
    pub certification: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentRating {
    pub iso_3166_1: String,
    #[serde(default)]
    pub rating: String,
}

#[derive(Debug, Deserialize)]
pub struct Images {
    #[serde(default)]
    pub posters: Vec<ImageFile>,
    #[serde(default)]
    pub backdrops: Vec<ImageFile>,
}

#[derive(Debug, Deserialize)]
pub struct ImageFile {
    pub file_path: String,
}

// Find by external ID
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    #[serde(default)]
    pub movie_results: Vec<MovieResult>,
    #[serde(default)]
    pub tv_results: Vec<TvResult>,
    #[serde(default)]
    pub tv_episode_results: Vec<EpisodeResult>,
}
