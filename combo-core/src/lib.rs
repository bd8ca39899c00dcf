//! Combo deal core: domain types, tiered cache, fetch coordination, sources, orchestrator.
//!
//! This crate contains the acquisition layer of the deal aggregator:
//! - Domain types (components, raw deals, detail data, combo types)
//! - Tiered cache with per-tier freshness rules and durable JSON files
//! - Fetch coordinator with retries, jittered backoff and per-source circuit breakers
//! - Source capability trait, registry and the HTTP, file and in-memory sources
//! - Orchestrator that runs listings, dedups and fills details and prices through the cache

pub mod cache;
pub mod domain;
pub mod fetch;
pub mod orchestrator;
pub mod sources;
