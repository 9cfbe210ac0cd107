//! Template-driven extraction for known document layouts.
//!
//! Some labs print forms whose OCR output is too degraded for generic
//! line parsing but whose layout is stable enough to extract against a
//! template: a profile names the phrases that identify the form and the
//! metrics it is expected to carry, with fallback reference ranges for
//! when the printed range column does not survive the scan. Profiles are
//! data; the matching and extraction machinery is shared.

use std::sync::LazyLock;

use regex::Regex;

use crate::alias;
use crate::status::classify;
use crate::types::MetricRecord;

/// How far past a metric's name fragment its value may sit.
const VALUE_WINDOW: usize = 5;

/// One metric a profiled form is expected to carry.
pub struct ExpectedMetric {
    /// Spellings under which the metric appears on the form, including
    /// known OCR misreadings.
    pub name_variants: &'static [&'static str],
    /// Label used for the emitted record.
    pub label: &'static str,
    /// Reference range printed on the form, used when the range column
    /// is lost to the scan.
    pub fallback_range: &'static str,
}

/// A known document layout.
pub struct DocumentProfile {
    pub name: &'static str,
    /// Phrases that identify the form, counted case-insensitively.
    pub indicators: &'static [&'static str],
    /// How many indicator phrases must appear before the profile claims
    /// a document.
    pub min_indicator_matches: usize,
    pub expected: &'static [ExpectedMetric],
}

static DECIMAL_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+[.,]\d+)").unwrap());

static RANGE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+[.,]?\d*\s*[-–]\s*\d+[.,]?\d*|<\s*\d+[.,]?\d*)").unwrap()
});

/// Kazakh-form unit misreadings seen on state clinic biochemistry forms.
static KAZAKH_UNIT_FIXES: &[(&str, &str)] = &[
    ("Едол", "Ед/л"),
    ("Едал", "Ед/л"),
    ("едол", "Ед/л"),
    ("едал", "Ед/л"),
    ("ммолыл", "ммоль/л"),
    ("МКМОЛЫл", "мкмоль/л"),
    ("мкмолыл", "мкмоль/л"),
    ("мгидл", "мг/дл"),
];

static UNIT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(ед[оа/]?л|ммол[ьы]?/?л|мкмол[ьы]?/?л|мг[и/]?дл|г/л|%)").unwrap()
});

impl DocumentProfile {
    /// True when enough identifying phrases appear in the document text.
    pub fn matches(&self, full_text: &str) -> bool {
        let lower = full_text.to_lowercase();
        let hits = self
            .indicators
            .iter()
            .filter(|phrase| lower.contains(&phrase.to_lowercase()))
            .count();
        if hits > 0 {
            tracing::debug!(profile = self.name, hits, "profile indicator scan");
        }
        hits >= self.min_indicator_matches
    }

    /// Extract every expected metric found in the fragment stream.
    pub fn extract(&self, fragments: &[String]) -> Vec<MetricRecord> {
        let mut records = Vec::new();

        for expected in self.expected {
            if let Some(record) = self.extract_metric(fragments, expected) {
                records.push(record);
            }
        }

        tracing::info!(
            profile = self.name,
            found = records.len(),
            expected = self.expected.len(),
            "template extraction finished"
        );
        records
    }

    fn extract_metric(
        &self,
        fragments: &[String],
        expected: &ExpectedMetric,
    ) -> Option<MetricRecord> {
        let anchor = fragments.iter().position(|fragment| {
            let lower = fragment.to_lowercase();
            expected
                .name_variants
                .iter()
                .any(|variant| lower.contains(&variant.to_lowercase()))
        })?;

        let window_end = (anchor + 1 + VALUE_WINDOW).min(fragments.len());
        let window = &fragments[anchor..window_end];

        let mut value: Option<f64> = None;
        let mut unit: Option<String> = None;
        let mut range: Option<String> = None;
        let mut source_line = fragments[anchor].trim().to_string();

        for fragment in window {
            if value.is_none() {
                if let Some(caps) = DECIMAL_VALUE.captures(fragment) {
                    if let Ok(parsed) = caps[1].replace(',', ".").parse::<f64>() {
                        value = Some(parsed);
                        source_line = fragment.trim().to_string();
                    }
                }
            }
            if unit.is_none() {
                if let Some(m) = UNIT_TOKEN.find(fragment) {
                    unit = Some(fix_kazakh_unit(m.as_str()));
                }
            }
            if range.is_none() && value.is_some() {
                if let Some(caps) = RANGE_SHAPE.captures(fragment) {
                    let candidate = caps[1].trim().to_string();
                    // The value's own fragment may contain the number
                    // itself; a range needs a bound marker.
                    if candidate.contains('-')
                        || candidate.contains('–')
                        || candidate.contains('<')
                    {
                        range = Some(candidate);
                    }
                }
            }
        }

        let value = value?;
        let unit = unit.unwrap_or_else(|| "Ед/л".to_string());
        let reference_range = range.unwrap_or_else(|| expected.fallback_range.to_string());
        let status = classify(value, &reference_range);

        Some(MetricRecord {
            name: alias::resolve(expected.label),
            raw_label: expected.label.to_string(),
            value,
            unit,
            reference_range,
            status,
            confidence: 0.70,
            original_line: source_line,
        })
    }
}

/// Substring fixes for units as they come off Kazakh state clinic forms.
fn fix_kazakh_unit(raw: &str) -> String {
    let mut unit = raw.trim().to_string();
    for (wrong, correct) in KAZAKH_UNIT_FIXES {
        if unit.contains(wrong) {
            unit = unit.replace(wrong, correct);
        }
    }
    unit
}

/// Kazakhstan state clinic biochemistry panel. The form is bilingual
/// (Kazakh headers, Russian analyte names) and its OCR output loses
/// most separators, so the generic line parser sees almost nothing.
pub static KAZAKH_BIOCHEMISTRY: DocumentProfile = DocumentProfile {
    name: "kazakh_biochemistry_panel",
    min_indicator_matches: 3,
    indicators: &[
        "Казакстан Республикасы",
        "Денсаулык сактау",
        "Каннын биохимиялык талдауы",
        "Калыпты мелшер",
        "Нэтиже",
        "Компоненттер",
        "Аланинаминотрансфераза",
        "Аспартатаминотрасфераза",
        "Едол",
        "Едал",
        "ммолыл",
        "МКМОЛЫл",
    ],
    expected: &[
        ExpectedMetric {
            name_variants: &["Аланинаминотрансфераза", "АЛТ"],
            label: "АЛТ",
            fallback_range: "3 - 45",
        },
        ExpectedMetric {
            name_variants: &["Аспартатаминотрасфераза", "АСТ"],
            label: "АСТ",
            fallback_range: "0 - 35",
        },
        ExpectedMetric {
            name_variants: &["Амилаза", "амилаза"],
            label: "Амилаза",
            fallback_range: "25 - 125",
        },
        ExpectedMetric {
            name_variants: &["Щелочная фосфатаза", "ЩФ"],
            label: "Щелочная фосфатаза",
            fallback_range: "45 - 125",
        },
        ExpectedMetric {
            name_variants: &["Гамма", "ГГТП"],
            label: "ГГТП",
            fallback_range: "11 - 61",
        },
        ExpectedMetric {
            name_variants: &["Глюкоза", "глюкоза", "сахар крови"],
            label: "Глюкоза",
            fallback_range: "3.05 - 6.4",
        },
        ExpectedMetric {
            name_variants: &["Билирубин общий", "билирубин"],
            label: "Билирубин общий",
            fallback_range: "< 22.0",
        },
    ],
};
