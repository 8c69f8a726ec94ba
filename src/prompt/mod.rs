//! Prompt construction for the content generator.
pub mod builder;
