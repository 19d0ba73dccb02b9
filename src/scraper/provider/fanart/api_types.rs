use serde::Deserialize;

/// One artwork entry; documents map category names to lists of these
#[derive(Debug, Deserialize)]
pub struct FanartImage {
    pub url: String,
    #[serde(default)]
    pub lang: String,
}
