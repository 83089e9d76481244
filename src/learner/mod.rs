// src/learner/mod.rs — Keyword learning from suggestion outcomes

pub mod keyword_stats;
pub mod recorder;
pub mod report;
pub mod scheduler;
