//! Content-based anime and manga recommendations.
//!
//! A query title is fuzzily resolved against the catalog, its neighbours are
//! read from a precomputed similarity matrix, re-ranked by genre and tag
//! overlap, formatted and enriched with trailer links.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
