//! Metrics surface
//!
//! Serves the fleet's drift state over HTTP. A cached lister shields the
//! remote API from scrape-frequency listing; the collector runs a read-only
//! pipeline over the cached fleet and renders the Prometheus text format.

pub mod cache;
pub mod collector;
pub mod server;
