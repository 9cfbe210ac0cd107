//! Extraction engine for photographed and scanned laboratory reports.
//!
//! The upstream OCR stage hands this crate an ordered sequence of recognized
//! text fragments per page. The engine turns that stream into typed
//! [`MetricRecord`]s (canonical name, numeric value, unit, reference range,
//! status, confidence) plus a [`DocumentVerdict`] judging whether the page
//! plausibly is a lab report at all.
//!
//! The engine is a pure function over its input: no I/O, no shared mutable
//! state, safe to call concurrently from however many workers the host runs.
//! Image recognition, PDF rasterization and everything downstream of the
//! structured records (explanations, risk scoring, persistence) live outside
//! this crate.

pub mod alias;
pub mod filter;
pub mod orchestrator;
pub mod profile;
pub mod proximity;
pub mod range;
pub mod skip;
pub mod status;
pub mod structural;
pub mod types;
pub mod validate;
pub mod value_parser;

pub use orchestrator::MetricExtractor;
pub use profile::{DocumentProfile, ExpectedMetric};
pub use types::{DocumentVerdict, ExtractionReport, MetricRecord, MetricStatus};
