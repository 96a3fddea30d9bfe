//! Part classification and text normalization.

pub mod classify;
pub mod text;

pub use classify::{classify, ContentClass};
pub use text::TextNormalizer;
