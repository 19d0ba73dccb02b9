mod nfo;

pub use nfo::{NfoSource, NfoWriter};
