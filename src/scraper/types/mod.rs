mod guess;
mod media;
mod metadata;

pub use guess::{Guess, Identifier, PartialGuess};
pub use media::{Candidate, GuessField, IdType, MediaType};
pub use metadata::{
    ExternalIds, ImageSet, ImageType, Metadata, MetadataField, MetadataValue, Person,
};
