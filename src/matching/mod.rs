// src/matching/mod.rs — Template matching pipeline

pub mod diversity;
pub mod engine;
pub mod extractor;
pub mod ranker;
pub mod rotation;
pub mod scorer;
pub mod types;
pub mod variant;
