//! Concrete collaborator implementations

pub mod clash_api;
pub mod normalizer;

#[cfg(test)]
pub mod tests;

pub use clash_api::ClashApiClient;
pub use normalizer::{classify_deck, DeckArchetype, RankedSinglesNormalizer};
