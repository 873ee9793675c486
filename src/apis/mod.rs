//! Typed HTTP clients for the upstream market-data APIs
//!
//! Clients here are deliberately thin: they translate endpoints and payloads
//! and surface HTTP 429 as a distinguishable error. Throttling, caching and
//! retry all live above them in the fetch pipeline.

pub mod client;
pub mod coingecko;
pub mod geckoterminal;
