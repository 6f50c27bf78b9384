//! Normalization and aggregation for public food-safety data feeds.
//!
//! One pipeline shared by every upstream (openFDA, CDC Socrata endpoints,
//! USDA-FSIS, NWSS wastewater): resolve fields on rows of unknown shape,
//! filter to a calendar-month window, aggregate into series and regional
//! tallies, forecast, and wrap results in status-flagged envelopes with demo
//! fallback when upstream is down.

pub mod aggregate;
pub mod envelope;
pub mod fallback;
pub mod feeds;
pub mod fetch;
pub mod forecast;
pub mod output;
pub mod rate;
pub mod regions;
pub mod resolve;
pub mod window;
