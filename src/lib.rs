//! Portfolio content backend.
//!
//! Serves posts, case studies and pages from a headless Ghost CMS through a
//! small JSON API. CMS reads are cached in memory and survive upstream
//! outages by serving the last value held.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
