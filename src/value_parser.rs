//! Value/unit parsing cascade.
//!
//! A value fragment arrives as noisy OCR text: decimal commas, scientific
//! notation split around the unit, qualitative verdicts, stray
//! administrative words. The cascade tries strategies from most to least
//! specific and reports which one matched through the confidence score.
//! Keeping the `10^n` exponent inside the unit (instead of multiplying it
//! into the value) preserves the mantissa exactly as printed and avoids
//! the formatting mismatches a folded-out value produces downstream.

use std::sync::LazyLock;

use regex::Regex;

/// Outcome of one successful cascade strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedValue {
    pub value: f64,
    pub unit: String,
    pub confidence: f32,
}

impl ParsedValue {
    fn new(value: f64, unit: impl Into<String>, confidence: f32) -> Self {
        Self {
            value,
            unit: unit.into(),
            confidence,
        }
    }
}

/// Unit marker for qualitative (detected / not detected) results.
pub const QUALITATIVE_UNIT: &str = "qualitative";

/// Administrative text that bleeds into value fragments on bad scans.
/// A hit fails the parse outright so later strategies cannot extract a
/// number out of a date or a form caption.
static CONTAMINATION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"\d{2}\.\d{2}\.\d{4}").unwrap(),
        Regex::new(r"(?i)алу орны").unwrap(),
        Regex::new(r"(?i)биоматериалды").unwrap(),
        Regex::new(r"(?i)результатах").unwrap(),
        Regex::new(r"(?i)отчет").unwrap(),
    ]
});

/// Qualitative verdicts: full-fragment matches only. Sentinels: 1.0 =
/// positive/detected, 0.0 = negative/not detected, 0.5 = normal.
static QUALITATIVE: LazyLock<Vec<(Regex, f64, f32)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)^не\s+обнаружено$").unwrap(), 0.0, 0.95),
        (Regex::new(r"(?i)^обнаружено$").unwrap(), 1.0, 0.95),
        (Regex::new(r"(?i)^отрицательно$").unwrap(), 0.0, 0.90),
        (Regex::new(r"(?i)^положительно$").unwrap(), 1.0, 0.90),
        (Regex::new(r"(?i)^позитивно$").unwrap(), 1.0, 0.90),
        (Regex::new(r"(?i)^негативно$").unwrap(), 0.0, 0.90),
        (Regex::new(r"(?i)^норма$").unwrap(), 0.5, 0.85),
        (Regex::new(r"(?i)^в\s+пределах\s+нормы$").unwrap(), 0.5, 0.85),
    ]
});

// "5.66 10^12/л": mantissa, power of ten, unit tail.
static SCIENTIFIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+[.,]?\d*)\s+10\^?(\d+)([а-яА-Яa-zA-Z/×·*^]+)").unwrap()
});

// Malformed scientific notation where OCR mangled the base: "319.00 109/л".
static COMPLEX_MULTIPLIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+[.,]?\d*)\s+(\d+\^?\d*)([а-яА-Яa-zA-Z/×·*^]+)").unwrap()
});

// Decimal broken by comma, dot or space: "5 66 ммоль/л" → 5.66.
static BROKEN_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)[.,\s]+(\d+)\s*([а-яА-Яa-zA-Z/%×·*^]+)").unwrap()
});

// Hepatitis-style combined verdict: "Не обнаружено, S/CO = 0,13".
static COMBINED_SCO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(не\s+обнаружено|обнаружено).*?S/CO\s*=\s*(\d+[,.]?\d*)").unwrap()
});

static BARE_SCO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)S/CO\s*=\s*(\d+[,.]?\d*)").unwrap());

// Number directly followed by a unit token, with an allow-list of unit
// spellings the generic letter run would otherwise split at the slash.
static STANDARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+[.,]?\d*)\s*([а-яА-Яa-zA-Z/%×·*^°]+(?:/[а-яА-Яa-zA-Z]+)?|U/L|МЕ/л|Ед/л|мкМЕ/мл|нг/мл|пг/мл|нг/дл|мг/л|мкг/л|сек|ммоль/л|мкмоль/л)",
    )
    .unwrap()
});

static ANY_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+[.,]?\d*)").unwrap());

static TRAILING_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([а-яА-Яa-zA-Z/%×·*^]+|U/L|МЕ/л|сек)").unwrap()
});

/// OCR unit corrections: missing slashes, Cyrillic ы read for /, and
/// administrative words glued where a unit should be. Order matters:
/// longer wrong forms are replaced before their substrings.
static UNIT_CORRECTIONS: &[(&str, &str)] = &[
    ("ммольл", "ммоль/л"),
    ("мкмольл", "мкмоль/л"),
    ("ммолыл", "ммоль/л"),
    ("мкмолыл", "мкмоль/л"),
    ("едл", "Ед/л"),
    ("мкгл", "мкг/л"),
    ("мгл", "мг/л"),
    ("гл", "г/л"),
    ("Биоматериалды", "Ед/л"),
    ("результатах", "Ед/л"),
];

/// Normalize a raw unit token through the OCR-correction table.
pub fn clean_unit(raw: &str) -> String {
    let mut unit = raw.trim().to_string();
    for (wrong, correct) in UNIT_CORRECTIONS {
        if unit.contains(wrong) {
            unit = unit.replace(wrong, correct);
        }
    }
    unit
}

fn parse_number(text: &str) -> Option<f64> {
    text.replace(',', ".").parse::<f64>().ok()
}

/// Run the strategy cascade over one value fragment.
///
/// Returns `None` when nothing matches; the caller must not synthesize a
/// record from a failed parse.
pub fn parse_value_and_unit(value_text: &str) -> Option<ParsedValue> {
    let fragment = value_text.trim();

    for pattern in CONTAMINATION.iter() {
        if pattern.is_match(fragment) {
            return None;
        }
    }

    for (pattern, sentinel, confidence) in QUALITATIVE.iter() {
        if pattern.is_match(fragment) {
            return Some(ParsedValue::new(*sentinel, QUALITATIVE_UNIT, *confidence));
        }
    }

    if let Some(caps) = SCIENTIFIC.captures(fragment) {
        if let Some(value) = parse_number(&caps[1]) {
            let exponent = &caps[2];
            let unit = clean_unit(&caps[3]);
            return Some(ParsedValue::new(value, format!("10^{exponent}{unit}"), 0.95));
        }
    }

    if let Some(caps) = COMPLEX_MULTIPLIER.captures(fragment) {
        if let Some(value) = parse_number(&caps[1]) {
            let multiplier = &caps[2];
            let unit = clean_unit(&caps[3]);
            if let Some((_, exponent)) = multiplier.split_once('^') {
                return Some(ParsedValue::new(value, format!("10^{exponent}{unit}"), 0.90));
            }
            return Some(ParsedValue::new(value, format!("×{multiplier}{unit}"), 0.85));
        }
    }

    if let Some(caps) = BROKEN_DECIMAL.captures(fragment) {
        let reassembled = format!("{}.{}", &caps[1], &caps[2]);
        if let Ok(value) = reassembled.parse::<f64>() {
            return Some(ParsedValue::new(value, clean_unit(&caps[3]), 0.80));
        }
    }

    if let Some(caps) = COMBINED_SCO.captures(fragment) {
        if let Some(value) = parse_number(&caps[2]) {
            return Some(ParsedValue::new(value, "S/CO", 0.95));
        }
    }

    if let Some(caps) = BARE_SCO.captures(fragment) {
        if let Some(value) = parse_number(&caps[1]) {
            return Some(ParsedValue::new(value, "S/CO", 0.90));
        }
    }

    if let Some(caps) = STANDARD.captures(fragment) {
        if let Some(value) = parse_number(&caps[1]) {
            return Some(ParsedValue::new(value, clean_unit(&caps[2]), 0.75));
        }
    }

    // Last resort: any leftover numeric token, unit defaulted.
    if let Some(m) = ANY_NUMBER.find(fragment) {
        if let Some(value) = parse_number(m.as_str()) {
            let rest = &fragment[m.end()..];
            let unit = TRAILING_UNIT
                .find(rest)
                .map(|u| clean_unit(u.as_str()))
                .unwrap_or_else(|| "units".to_string());
            return Some(ParsedValue::new(value, unit, 0.50));
        }
    }

    None
}

/// Post-parse plausibility gate.
///
/// Even a successful parse can be an artifact: a known OCR failure mode
/// turns `... 10^9/л` into a literal `9 /л`; zero and negative readings
/// do not occur for quantitative analytes; values past 10 000 without a
/// `10^` exponent in the unit are outside any plausible analyte scale.
pub fn is_suspicious_value(value: f64, unit: &str) -> bool {
    if unit == QUALITATIVE_UNIT {
        return false;
    }

    if (value - 9.0).abs() < f64::EPSILON && (unit == "/л" || unit == "/L") {
        return true;
    }

    if value <= 0.0 {
        return true;
    }

    if !unit.contains("10^") && value > 10_000.0 {
        return true;
    }

    false
}
