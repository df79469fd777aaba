#![deny(missing_docs)]

//! Core library for the AskPDF service: upload a PDF, get a summary, ask questions about it.

/// HTTP routing and REST handlers.
pub mod api;
/// Chat-completion client abstraction and adapters.
pub mod chat;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Document processing pipeline.
pub mod processing;
/// Session directories and the persisted vector index.
pub mod store;
