//! Core library: source extraction, document building, index lifecycle,
//! lookups and batch orchestration for HS classification codes.

pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod search;
