use crate::scraper::{
    Result, ScraperError,
    matcher::Disambiguation,
    provider::IdentifierProvider,
    types::{Guess, IdType, Identifier},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolve a guess into catalog ids.
///
/// Providers run in order and each sees what the previous ones found; slots
/// already filled are never overwritten. Provider failures are logged and
/// skipped, except a user abort which ends resolution. Fails with
/// `NotEnoughData` when any of `required_ids` is still missing afterwards.
pub async fn resolve_identifier(
    guess: &Guess,
    providers: &[Arc<dyn IdentifierProvider>],
    required_ids: &[IdType],
    disambiguation: &Disambiguation,
) -> Result<Identifier> {
    let mut identifier = Identifier::seed(guess);

    for provider in providers {
        match provider.identify(guess, &identifier, disambiguation).await {
            Ok(Some(ids)) => {
                debug!("{} identified {:?}", provider.name(), ids);
                identifier.ids.fill_from(&ids);
            }
            Ok(None) => debug!("{} could not identify '{}'", provider.name(), guess.title),
            Err(ScraperError::Aborted) => return Err(ScraperError::Aborted),
            Err(e) => warn!("{} failed to identify '{}': {}", provider.name(), guess.title, e),
        }
    }

    let missing = identifier.ids.missing(required_ids);
    if !missing.is_empty() {
        let missing: Vec<&str> = missing.iter().map(|id_type| id_type.as_str()).collect();
        return Err(ScraperError::NotEnoughData(format!(
            "{} '{}' is missing ids: {}",
            guess.media_type,
            guess.title,
            missing.join(", ")
        )));
    }

    debug!("Resolved {}", identifier);
    Ok(identifier)
}
