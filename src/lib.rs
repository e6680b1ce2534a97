//! Water density anomaly explorer: density model, chart series, debounced
//! explanation fetching and the view state that ties them together.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod density;
pub mod diagrams;
pub mod explanation;
pub mod fetcher;
pub mod gemini;
pub mod series;
pub mod session;
