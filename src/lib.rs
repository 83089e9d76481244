// src/lib.rs — Library root for adreply

pub mod cli;
pub mod infra;
pub mod learner;
pub mod matching;
pub mod memory;
