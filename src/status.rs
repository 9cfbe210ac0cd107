//! Status classification: parsed value vs. displayed reference range.

use std::sync::LazyLock;

use regex::Regex;

use crate::range::NOT_SPECIFIED;
use crate::types::MetricStatus;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+[.,]?\d*").unwrap());

/// Range-text keywords consulted when no numeric bound is present.
/// Negated forms listed before their stems so "не обнаружено" is not
/// swallowed by "обнаружено".
static STATUS_KEYWORDS: &[(&str, MetricStatus)] = &[
    ("не обнаружено", MetricStatus::NotDetected),
    ("обнаружено", MetricStatus::Detected),
    ("повышено", MetricStatus::Elevated),
    ("увеличено", MetricStatus::Elevated),
    ("понижено", MetricStatus::Low),
    ("снижено", MetricStatus::Low),
    ("в пределах нормы", MetricStatus::Normal),
    ("нормально", MetricStatus::Normal),
    ("норма", MetricStatus::Normal),
    ("положительно", MetricStatus::Detected),
    ("отрицательно", MetricStatus::NotDetected),
    ("elevated", MetricStatus::Elevated),
    ("within normal limits", MetricStatus::Normal),
];

/// Classify a parsed value against the raw range text.
///
/// Qualitative sentinel values with no displayed range map directly.
/// With two numbers the range is an interval; with one it is a single
/// bound whose direction comes from comparator words. A `<` bound on an
/// S/CO range is a detection cutoff rather than a normality limit. With
/// no numeric bound the keyword table decides; absent any signal the
/// classifier falls back to `Normal`.
pub fn classify(value: f64, range_text: &str) -> MetricStatus {
    if range_text == NOT_SPECIFIED {
        if value == 1.0 {
            return MetricStatus::Detected;
        }
        if value == 0.0 {
            return MetricStatus::NotDetected;
        }
        if value == 0.5 {
            return MetricStatus::Normal;
        }
    }

    let bounds: Vec<f64> = NUMBER
        .find_iter(range_text)
        .filter_map(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        .collect();

    match bounds.len() {
        n if n >= 2 => {
            let (min, max) = (bounds[0], bounds[1]);
            if value < min {
                MetricStatus::Low
            } else if value > max {
                MetricStatus::High
            } else {
                MetricStatus::Normal
            }
        }
        1 => classify_single_bound(value, bounds[0], range_text),
        _ => classify_by_keyword(range_text),
    }
}

fn classify_single_bound(value: f64, bound: f64, range_text: &str) -> MetricStatus {
    let lower = range_text.to_lowercase();

    if lower.contains("менее") || lower.contains('<') {
        // S/CO bounds are detection cutoffs, not normality limits.
        if lower.contains("s/co") {
            return if value <= bound {
                MetricStatus::NotDetected
            } else {
                MetricStatus::Detected
            };
        }
        return if value <= bound {
            MetricStatus::Normal
        } else {
            MetricStatus::High
        };
    }

    if lower.contains("более") || lower.contains('>') {
        return if value >= bound {
            MetricStatus::Normal
        } else {
            MetricStatus::Low
        };
    }

    // Bare single number: tolerate a 10% band around it.
    if bound != 0.0 && ((value - bound).abs() / bound) < 0.10 {
        MetricStatus::Normal
    } else if value > bound {
        MetricStatus::High
    } else {
        MetricStatus::Low
    }
}

fn classify_by_keyword(range_text: &str) -> MetricStatus {
    let lower = range_text.to_lowercase();
    for (keyword, status) in STATUS_KEYWORDS {
        if lower.contains(keyword) {
            return *status;
        }
    }
    MetricStatus::Normal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_classification() {
        assert_eq!(classify(145.0, "130,00 - 160,00"), MetricStatus::Normal);
        assert_eq!(classify(163.0, "130,00 - 160,00"), MetricStatus::High);
        assert_eq!(classify(120.0, "130,00 - 160,00"), MetricStatus::Low);
    }

    #[test]
    fn interval_bounds_inclusive() {
        assert_eq!(classify(130.0, "130,00 - 160,00"), MetricStatus::Normal);
        assert_eq!(classify(160.0, "130,00 - 160,00"), MetricStatus::Normal);
    }

    #[test]
    fn qualitative_sentinels_without_range() {
        assert_eq!(classify(1.0, NOT_SPECIFIED), MetricStatus::Detected);
        assert_eq!(classify(0.0, NOT_SPECIFIED), MetricStatus::NotDetected);
        assert_eq!(classify(0.5, NOT_SPECIFIED), MetricStatus::Normal);
    }

    #[test]
    fn sco_cutoff_is_detection_semantics() {
        assert_eq!(classify(0.13, "S/CO < 1,0"), MetricStatus::NotDetected);
        assert_eq!(classify(2.4, "S/CO < 1,0"), MetricStatus::Detected);
    }

    #[test]
    fn plain_upper_bound() {
        assert_eq!(classify(18.0, "менее 22.0"), MetricStatus::Normal);
        assert_eq!(classify(25.0, "< 22.0"), MetricStatus::High);
    }

    #[test]
    fn lower_bound() {
        assert_eq!(classify(35.0, "> 30"), MetricStatus::Normal);
        assert_eq!(classify(20.0, "более 30"), MetricStatus::Low);
    }

    #[test]
    fn bare_single_number_tolerance_band() {
        assert_eq!(classify(102.0, "100"), MetricStatus::Normal);
        assert_eq!(classify(130.0, "100"), MetricStatus::High);
        assert_eq!(classify(70.0, "100"), MetricStatus::Low);
    }

    #[test]
    fn keyword_fallback() {
        assert_eq!(classify(7.0, "повышено"), MetricStatus::Elevated);
        assert_eq!(classify(7.0, "понижено"), MetricStatus::Low);
        assert_eq!(classify(7.0, "в пределах нормы"), MetricStatus::Normal);
        assert_eq!(classify(7.0, "не обнаружено"), MetricStatus::NotDetected);
    }

    #[test]
    fn ambiguous_range_defaults_to_normal() {
        // No bound and no recognized keyword defaults to normal.
        assert_eq!(classify(7.0, "см. комментарий"), MetricStatus::Normal);
        assert_eq!(classify(7.0, NOT_SPECIFIED), MetricStatus::Normal);
    }
}
