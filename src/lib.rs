//! Groupie Tracker
//!
//! Fetches artists and their locations, concert dates and relations from the
//! upstream API, joins them into one record per artist and serves the cached
//! collection through filtered listing and lookup by id.
//!
//! Data flow: [`sources`] -> [`ingestor`] -> [`cache`] -> [`query`] -> [`web`].

pub mod cache;
pub mod config;
pub mod errors;
pub mod ingestor;
pub mod metrics;
pub mod models;
pub mod query;
pub mod sources;
pub mod web;
