use serde::{Deserialize, Serialize};

/// One recognized lab value.
///
/// Records are immutable once created and owned by whoever receives the
/// orchestrator's result. For qualitative results `value` carries a fixed
/// sentinel: `1.0` = positive/detected, `0.0` = negative/not detected,
/// `0.5` = qualitatively normal, with `unit == "qualitative"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    /// Canonical lowercase, underscore-joined identifier (e.g. `hemoglobin`).
    pub name: String,
    /// The label text as detected, before alias resolution. Kept for audit.
    pub raw_label: String,
    pub value: f64,
    /// Free-form unit. May embed a scientific-notation exponent
    /// (`10^9/л`) or the literal marker `qualitative`.
    pub unit: String,
    /// Raw displayed range text, or `"Not specified"` when absent.
    pub reference_range: String,
    pub status: MetricStatus,
    /// Heuristic reliability of the parse strategy that matched, in [0,1].
    pub confidence: f32,
    /// The full source line, for debugging.
    pub original_line: String,
}

/// Closed status set assigned by the classifier. Always present on a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    Normal,
    Low,
    High,
    Elevated,
    Detected,
    NotDetected,
    Unknown,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Normal => "normal",
            MetricStatus::Low => "low",
            MetricStatus::High => "high",
            MetricStatus::Elevated => "elevated",
            MetricStatus::Detected => "detected",
            MetricStatus::NotDetected => "not_detected",
            MetricStatus::Unknown => "unknown",
        }
    }
}

/// Overall plausibility judgment for one processed document or page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentVerdict {
    pub valid: bool,
    pub validation_message: String,
    /// Number of records that contributed to the verdict.
    pub metric_count: usize,
}

/// What the orchestrator hands back per page (or per merged document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub metrics: Vec<MetricRecord>,
    pub verdict: DocumentVerdict,
    /// Page/image quality description. Supplied by the external image
    /// analyzer when available, otherwise a metric-count summary.
    pub summary: String,
}
