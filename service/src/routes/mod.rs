//! HTTP route definitions.
//!
//! Demo routes run behind the instrumented handler wrapper; the scrape and
//! health routes do not, so scraping does not show up in request metrics.

mod demo;
mod health;
mod metrics;

pub use demo::demo_routes;
pub use health::health_routes;
pub use metrics::metrics_routes;
