//! Gallery intake library.
//!
//! A service that ingests images from direct upload or web scraping,
//! fingerprints each one perceptually, flags near-duplicates against the
//! accumulated corpus, and tracks a moderation lifecycle for a curated
//! image gallery.

pub mod blob;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod intake;
pub mod moderation;
pub mod scrape;
pub mod web;
