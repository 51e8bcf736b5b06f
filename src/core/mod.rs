//! Core engine — type model, directives, extraction, interceptors, generation.

pub mod directive;
pub mod directives;
pub mod extractor;
pub mod generate;
pub mod intercept;
pub mod output;
pub mod parser;
pub mod queue;
pub mod state;
pub mod types;
pub mod walker;
