use crate::scraper::{
    Result,
    provider::GuessProvider,
    types::{Guess, MediaType, PartialGuess},
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Merge the guesses of `providers`, in order, into one finalized guess.
///
/// The first provider offering a value for a field wins. `forced_type`
/// overrides every provider's media type. A provider error fails the file;
/// a provider with nothing to say is skipped.
pub async fn aggregate_guess(
    filepath: &Path,
    providers: &[Arc<dyn GuessProvider>],
    forced_type: Option<MediaType>,
) -> Result<Guess> {
    let mut merged = PartialGuess {
        media_type: forced_type,
        ..PartialGuess::default()
    };

    for provider in providers {
        match provider.guess(filepath).await? {
            Some(partial) => {
                debug!("{} guessed {:?}", provider.name(), partial);
                merged.merge(partial);
            }
            None => debug!("{} has no guess for {}", provider.name(), filepath.display()),
        }
    }

    let guess = Guess::finalize(filepath, merged)?;
    debug!(
        "Guess for {}: {} '{}' year={:?} season={:?} episode={:?}",
        filepath.display(),
        guess.media_type,
        guess.title,
        guess.year,
        guess.season,
        guess.episode
    );
    Ok(guess)
}
