use thiserror::Error;

/// Why a candidate line or fragment was dropped during extraction.
///
/// Skips are local by contract: they are logged and the rest of the
/// document keeps processing. Nothing here ever reaches the caller as an
/// error; the engine always returns a report.
#[derive(Error, Debug, PartialEq)]
pub enum SkipReason {
    #[error("rejected by validity rule '{0}'")]
    FilterRejected(&'static str),

    #[error("no parse strategy matched the value fragment")]
    ParseFailed,

    #[error("suspicious value {value} {unit} (likely a parse artifact)")]
    SuspiciousValue { value: f64, unit: String },
}
