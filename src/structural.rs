//! Primary line-oriented extraction pipeline.
//!
//! Walks line-delimited text, splits each line at its FIRST separator
//! (reference ranges legitimately contain later colons), gates it through
//! the validity filter, then runs parser → range extractor → classifier →
//! alias table. Failures are local: a line that will not parse is logged
//! and skipped, never aborting the rest of the document.

use crate::alias;
use crate::filter::{rejecting_rule, LineCandidate};
use crate::range::extract_reference_range;
use crate::skip::SkipReason;
use crate::status::classify;
use crate::types::MetricRecord;
use crate::value_parser::{is_suspicious_value, parse_value_and_unit};

/// Extract metric records from line-delimited text.
pub fn extract_from_text(text: &str) -> Vec<MetricRecord> {
    let mut metrics = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        match extract_from_line(line) {
            Ok(Some(record)) => {
                tracing::debug!(
                    line = line_num,
                    name = %record.name,
                    value = record.value,
                    unit = %record.unit,
                    confidence = record.confidence,
                    "parsed metric line"
                );
                metrics.push(record);
            }
            Ok(None) => {}
            Err(reason) => {
                tracing::debug!(line = line_num, %reason, "skipped line");
            }
        }
    }

    tracing::debug!(count = metrics.len(), "structural extraction finished");
    metrics
}

/// Process one line. `Ok(None)` means the line has no label/value shape
/// at all; `Err` names why a shaped candidate was dropped.
fn extract_from_line(line: &str) -> Result<Option<MetricRecord>, SkipReason> {
    let Some((label, value_text)) = line.split_once(':') else {
        return Ok(None);
    };

    let label = label.trim();
    let value_text = value_text.trim();
    if value_text.is_empty() {
        return Ok(None);
    }

    let candidate = LineCandidate {
        label,
        value_text,
        full_line: line,
    };
    if let Some(rule) = rejecting_rule(&candidate) {
        return Err(SkipReason::FilterRejected(rule));
    }

    let Some(parsed) = parse_value_and_unit(value_text) else {
        return Err(SkipReason::ParseFailed);
    };

    if is_suspicious_value(parsed.value, &parsed.unit) {
        return Err(SkipReason::SuspiciousValue {
            value: parsed.value,
            unit: parsed.unit,
        });
    }

    let reference_range = extract_reference_range(value_text);
    let status = classify(parsed.value, &reference_range);
    let name = alias::resolve(label);

    Ok(Some(MetricRecord {
        name,
        raw_label: label.to_string(),
        value: parsed.value,
        unit: parsed.unit,
        reference_range,
        status,
        confidence: parsed.confidence,
        original_line: line.trim().to_string(),
    }))
}
