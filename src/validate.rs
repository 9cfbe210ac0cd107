//! Document-level plausibility verdict.
//!
//! Extraction alone cannot tell a lab report from a random photo: zero
//! metrics may mean a bad scan of a real report, and one metric is more
//! often a parse artifact than a one-line report. The verdict combines
//! the metric count with a bilingual medical-vocabulary scan so the
//! caller can tell the user what to do about a rejected upload.

use crate::types::{DocumentVerdict, MetricRecord};

/// Medical vocabulary counted across the raw document text, Russian and
/// English. Three distinct hits are enough to accept a document that
/// yielded no structured metrics.
static MEDICAL_KEYWORDS: &[&str] = &[
    "анализ",
    "кровь",
    "крови",
    "моча",
    "мочи",
    "гемоглобин",
    "лейкоциты",
    "эритроциты",
    "тромбоциты",
    "глюкоза",
    "холестерин",
    "билирубин",
    "белок",
    "норма",
    "референс",
    "лаборатория",
    "исследование",
    "пациент",
    "результат",
    "гормон",
    "антитела",
    "гепатит",
    "blood",
    "urine",
    "hemoglobin",
    "glucose",
    "cholesterol",
    "laboratory",
    "test",
    "result",
    "patient",
    "analysis",
    "hormone",
];

const KEYWORD_THRESHOLD: usize = 3;

/// Judge whether the document plausibly is a medical report.
pub fn validate_document(metrics: &[MetricRecord], full_text: &str) -> DocumentVerdict {
    let metric_count = metrics.len();

    if metric_count >= 2 {
        return DocumentVerdict {
            valid: true,
            validation_message: "Valid medical document detected with multiple health metrics."
                .to_string(),
            metric_count,
        };
    }

    let keyword_hits = count_medical_keywords(full_text);
    tracing::debug!(metric_count, keyword_hits, "document validation");

    if metric_count == 0 && keyword_hits >= KEYWORD_THRESHOLD {
        return DocumentVerdict {
            valid: true,
            validation_message:
                "Document contains medical terminology but few structured metrics.".to_string(),
            metric_count,
        };
    }

    if metric_count == 1 {
        if keyword_hits >= KEYWORD_THRESHOLD {
            return DocumentVerdict {
                valid: true,
                validation_message:
                    "Document contains medical terminology but few structured metrics."
                        .to_string(),
                metric_count,
            };
        }
        return DocumentVerdict {
            valid: false,
            validation_message:
                "Document contains only one health metric. Please upload a complete medical report."
                    .to_string(),
            metric_count,
        };
    }

    DocumentVerdict {
        valid: false,
        validation_message:
            "This doesn't appear to be a medical document. Please upload a lab report or medical test result."
                .to_string(),
        metric_count,
    }
}

/// Count how many DISTINCT keywords appear, not total occurrences; a
/// word repeated across a form's header rows is one signal, not many.
fn count_medical_keywords(text: &str) -> usize {
    let lower = text.to_lowercase();
    MEDICAL_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .count()
}
