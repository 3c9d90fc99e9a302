//! Exoplanet catalog lifecycle and disposition classifier.
/// Application directory resolution.
pub mod app_dirs;
/// In-memory catalog, record generation and listing.
pub mod catalog;
/// Command-line parsing and dispatch.
pub mod cli;
/// `nebulax.toml` settings.
pub mod config;
mod http_client;
/// Archive ingestion and row normalization.
pub mod ingest;
/// Light-curve quick look.
pub mod lightcurve;
/// Tracing initialization.
pub mod logging;
/// Random-forest classifier pipeline.
pub mod ml;
/// Store construction from settings.
pub mod setup;
