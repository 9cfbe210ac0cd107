//! Line validity gate.
//!
//! "label: value"-shaped text is the dominant false-positive source:
//! timestamps, section headers and demographic fields all look like
//! metric lines. The gate is an ordered table of named reject rules so
//! each heuristic can be tested and tuned on its own. Rules are strict
//! about dates and headers, permissive about unrecognized metric names:
//! discarding a legitimate but unknown analyte costs more than letting a
//! stray line through to the parser, which will fail it anyway.

use std::sync::LazyLock;

use regex::Regex;

/// One candidate line, already split at its first separator.
#[derive(Debug, Clone, Copy)]
pub struct LineCandidate<'a> {
    pub label: &'a str,
    pub value_text: &'a str,
    pub full_line: &'a str,
}

/// A named reject predicate. Evaluated in table order; the first hit
/// rejects the line.
pub struct RejectRule {
    pub name: &'static str,
    rejects: fn(&LineCandidate) -> bool,
}

/// The rule table, in evaluation order.
pub static REJECT_RULES: &[RejectRule] = &[
    RejectRule {
        name: "datetime_shape",
        rejects: is_datetime_line,
    },
    RejectRule {
        name: "section_header",
        rejects: is_section_header,
    },
    RejectRule {
        name: "implausible_label",
        rejects: has_implausible_label,
    },
    RejectRule {
        name: "no_numeric_content",
        rejects: lacks_numeric_content,
    },
    RejectRule {
        name: "no_unit_indicator",
        rejects: lacks_unit_indicator,
    },
];

/// Run the rule table. `None` means the line passed; `Some(name)` names
/// the rejecting rule.
pub fn rejecting_rule(candidate: &LineCandidate) -> Option<&'static str> {
    REJECT_RULES
        .iter()
        .find(|rule| (rule.rejects)(candidate))
        .map(|rule| rule.name)
}

pub fn is_valid_metric_line(label: &str, value_text: &str, full_line: &str) -> bool {
    rejecting_rule(&LineCandidate {
        label,
        value_text,
        full_line,
    })
    .is_none()
}

// ---- datetime_shape ----

static DATE_IN_LABEL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"\d{1,2}[./]\d{1,2}[./]\d{4}").unwrap(),
        Regex::new(r"\d{4}[./]\d{1,2}[./]\d{1,2}").unwrap(),
    ]
});

static STANDALONE_TIME: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^\d{1,2}:\d{2}$").unwrap(),
        Regex::new(r"^\d{1,2}\.\d{2}$").unwrap(),
    ]
});

static TIMESTAMP_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}[./]\d{1,2}[./]\d{4}\s+\d{1,2}:\d{2}").unwrap());

static MEDICAL_RANGE_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)норма|range|г/л|мг/дл|ммоль/л|мкмоль/л|%|пг|фл|/л|мм/час").unwrap()
});

/// Labels that legitimately contain "time"-like words: coagulation times,
/// vitamin D's "25-ОН" reading as a clock fragment on bad scans.
static MEDICAL_CONTEXT_IN_LABEL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)витамин").unwrap(),
        Regex::new(r"(?i)время").unwrap(),
        Regex::new(r"(?i)он").unwrap(),
        Regex::new(r"(?i)протромбин").unwrap(),
        Regex::new(r"(?i)тромбин").unwrap(),
        Regex::new(r"(?i)25.?он").unwrap(),
    ]
});

static LAB_CODE_IN_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]{2,5}").unwrap());

static UNIT_IN_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"г/л|мг/дл|ммоль/л").unwrap());

static DATETIME_WORDS: &[&str] = &["дата", "время", "date", "time", "час", "мин", "сек"];

fn is_datetime_line(c: &LineCandidate) -> bool {
    let label_lower = c.label.to_lowercase();

    if MEDICAL_CONTEXT_IN_LABEL
        .iter()
        .any(|p| p.is_match(&label_lower))
    {
        return false;
    }

    if DATE_IN_LABEL.iter().any(|p| p.is_match(c.label)) {
        return true;
    }

    let value = c.value_text.trim();
    if STANDALONE_TIME.iter().any(|p| p.is_match(value))
        && !MEDICAL_RANGE_MARKERS.is_match(value)
    {
        return true;
    }

    if TIMESTAMP_LINE.is_match(c.full_line) {
        return true;
    }

    for word in DATETIME_WORDS {
        if label_lower.contains(word)
            && !LAB_CODE_IN_LABEL.is_match(c.label)
            && !UNIT_IN_VALUE.is_match(c.value_text)
        {
            return true;
        }
    }

    false
}

// ---- section_header ----

static HEADER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)абс\s*:?\s*кол-во").unwrap(),
        Regex::new(r"(?i)общий\s+анализ").unwrap(),
        Regex::new(r"(?i)биохимический").unwrap(),
        Regex::new(r"(?i)клинический").unwrap(),
        Regex::new(r"(?i)показатели").unwrap(),
        Regex::new(r"(?i)результаты").unwrap(),
        Regex::new(r"(?i)пациент").unwrap(),
        Regex::new(r"(?i)заключение").unwrap(),
        Regex::new(r"(?i)описание").unwrap(),
        Regex::new(r"(?i)комментарий").unwrap(),
    ]
});

static QUALITATIVE_WORDS: &[&str] = &[
    "не обнаружено",
    "обнаружено",
    "отрицательно",
    "положительно",
    "позитивно",
    "негативно",
    "норма",
];

static NUMBER_WITH_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[.,]?\d*\s*[а-яА-Яa-zA-Z/%×·*^°]+").unwrap());

/// Test names that read like prose but are genuine metrics.
static TEST_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)антитела").unwrap(),
        Regex::new(r"(?i)гепатит").unwrap(),
        Regex::new(r"(?i)маркер").unwrap(),
        Regex::new(r"(?i)анти").unwrap(),
        Regex::new(r"(?i)hbs").unwrap(),
        Regex::new(r"(?i)hcv").unwrap(),
    ]
});

fn has_qualitative_word(text: &str) -> bool {
    let lower = text.to_lowercase();
    QUALITATIVE_WORDS.iter().any(|w| lower.contains(w))
}

fn is_section_header(c: &LineCandidate) -> bool {
    if HEADER_PATTERNS
        .iter()
        .any(|p| p.is_match(c.label) || p.is_match(c.value_text))
    {
        return true;
    }

    // A qualitative verdict marks a real test line, never a header.
    if has_qualitative_word(c.value_text) {
        return false;
    }

    if !NUMBER_WITH_UNIT.is_match(c.value_text) {
        let long_label = c.label.chars().count() > 20;
        let no_digits = !c.value_text.chars().any(|ch| ch.is_ascii_digit());
        if (long_label || no_digits)
            && !TEST_NAME_PATTERNS.iter().any(|p| p.is_match(c.label))
        {
            return true;
        }
    }

    false
}

// ---- implausible_label ----

static DEMOGRAPHIC_LABELS: &[&str] =
    &["возраст", "пол", "id", "номер", "кабинет", "врач", "пациент"];

static SINGLE_LETTER_CODES: &[&str] = &["T", "P", "R", "H", "K"];

/// Curated fragments of metric names: lab-code shapes, CBC cell lines,
/// biochemistry, hormones, coagulation, hepatitis markers. A match
/// short-circuits the label checks to accept; absence is NOT a reject,
/// unknown analytes pass by default.
static MEDICAL_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^[A-Z]{2,5}[#%]?$").unwrap(),
        Regex::new(r"(?i)гемоглобин|эритроциты|лейкоциты|тромбоциты|гематокрит").unwrap(),
        Regex::new(r"(?i)нейтрофилы|лимфоциты|моноциты|эозинофилы|базофилы").unwrap(),
        Regex::new(r"(?i)белок|альбумин|креатинин|глюкоза|магний|билирубин").unwrap(),
        Regex::new(r"(?i)алт|алат|аст|асат|ггт|ггтп|гамма.?гт").unwrap(),
        Regex::new(r"(?i)щелочная.?фосфатаза|щф|амилаза").unwrap(),
        Regex::new(r"(?i)гликированный|гликозилированный|реактивный.?белок|срб").unwrap(),
        Regex::new(r"(?i)холестерин|лпвп|лпнп|триглицериды").unwrap(),
        Regex::new(r"(?i)калий|натрий|кальций|мочевина|мочевая").unwrap(),
        Regex::new(r"(?i)ттг|тиреотропный|свободный.?т[34]|витамин.?d|25.?он").unwrap(),
        Regex::new(r"(?i)ачтв|аптв|мно|протромбиновое|тромбиновое|протромбиновый|фибриноген")
            .unwrap(),
        Regex::new(r"(?i)антитела|гепатит|hbsag|anti.?hcv").unwrap(),
        Regex::new(r"(?i)соэ|^t$|^ph$|hba1c|crp|hdl|ldl|tsh|ft[34]|inr").unwrap(),
        // Medical-sounding suffixes
        Regex::new(r"(?i)цит|глобин|фил|коз|тромб").unwrap(),
    ]
});

fn has_implausible_label(c: &LineCandidate) -> bool {
    let label = c.label.trim();
    let char_count = label.chars().count();

    if char_count > 50 {
        return true;
    }

    if char_count == 1 {
        return !SINGLE_LETTER_CODES.contains(&label.to_uppercase().as_str());
    }

    if char_count < 2 {
        return true;
    }

    // Demographics before the pattern accept: "возраст" would otherwise
    // slip through on the "аст" substring.
    let label_lower = label.to_lowercase();
    if DEMOGRAPHIC_LABELS.iter().any(|d| label_lower == *d) {
        return true;
    }

    // Known metric shapes are accepted outright.
    if MEDICAL_NAME_PATTERNS.iter().any(|p| p.is_match(label)) {
        return false;
    }

    // Default accept: unrecognized names may be legitimate metrics.
    false
}

// ---- no_numeric_content ----

fn lacks_numeric_content(c: &LineCandidate) -> bool {
    if has_qualitative_word(c.value_text) {
        return false;
    }
    !c.value_text.chars().any(|ch| ch.is_ascii_digit())
}

// ---- no_unit_indicator ----

static UNIT_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)г/л|мг/дл|ммоль/л|мкмоль/л|%|пг|фл|/л|мм/час").unwrap(),
        Regex::new(r"(?i)10\^|E\+|×|°C|°F|ед").unwrap(),
        Regex::new(r"(?i)U/L|МЕ/л|Ед/л|мг/л|мкг/л|нг/мл|пг/мл|нг/дл|мкМЕ/мл").unwrap(),
        Regex::new(r"(?i)сек").unwrap(),
        Regex::new(r"(?i)S/CO").unwrap(),
        // Number directly followed by some unit-ish token, or a
        // parenthesized range after the number
        Regex::new(r"\d+[.,]?\d*\s*[а-яА-Яa-zA-Z/%×·*^°]+").unwrap(),
        Regex::new(r"\d+[.,]?\d*\s*\([^)]*\)").unwrap(),
    ]
});

fn lacks_unit_indicator(c: &LineCandidate) -> bool {
    if has_qualitative_word(c.value_text) {
        return false;
    }
    !UNIT_INDICATORS.iter().any(|p| p.is_match(c.value_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate<'a>(label: &'a str, value: &'a str, line: &'a str) -> LineCandidate<'a> {
        LineCandidate {
            label,
            value_text: value,
            full_line: line,
        }
    }

    #[test]
    fn timestamp_line_rejected() {
        let c = candidate("26.04.2025", "16:12", "26.04.2025: 16:12");
        assert_eq!(rejecting_rule(&c), Some("datetime_shape"));
    }

    #[test]
    fn standalone_time_value_rejected() {
        let c = candidate("Отбор", "14:19", "Отбор: 14:19");
        assert_eq!(rejecting_rule(&c), Some("datetime_shape"));
    }

    #[test]
    fn prothrombin_time_not_a_timestamp() {
        let c = candidate(
            "Протромбиновое время",
            "12,5 сек (норма: 11,0 - 16,0)",
            "Протромбиновое время: 12,5 сек (норма: 11,0 - 16,0)",
        );
        assert_eq!(rejecting_rule(&c), None);
    }

    #[test]
    fn vitamin_d_label_not_a_timestamp() {
        let c = candidate(
            "25-ОН витамин D",
            "32,4 нг/мл (норма: 30 - 100)",
            "25-ОН витамин D: 32,4 нг/мл (норма: 30 - 100)",
        );
        assert_eq!(rejecting_rule(&c), None);
    }

    #[test]
    fn section_header_rejected() {
        let c = candidate(
            "Общий анализ крови",
            "показатели",
            "Общий анализ крови: показатели",
        );
        assert_eq!(rejecting_rule(&c), Some("section_header"));
    }

    #[test]
    fn hepatitis_test_with_qualitative_result_is_not_a_header() {
        let c = candidate(
            "Антитела к гепатиту C",
            "Не обнаружено",
            "Антитела к гепатиту C: Не обнаружено",
        );
        assert_eq!(rejecting_rule(&c), None);
    }

    #[test]
    fn demographic_labels_rejected() {
        for label in ["Возраст", "Кабинет", "Врач"] {
            let line = format!("{label}: 42");
            let c = candidate(label, "42", &line);
            assert!(
                rejecting_rule(&c).is_some(),
                "demographic label {label} should be rejected"
            );
        }
    }

    #[test]
    fn demographic_with_qualitative_value_still_label_rejected() {
        // Rule (b) exemption applies to headers; "возраст" is a
        // demographic label regardless of the value shape.
        let c = candidate("возраст", "45 лет", "возраст: 45 лет");
        assert_eq!(rejecting_rule(&c), Some("implausible_label"));
    }

    #[test]
    fn overlong_label_rejected() {
        let label =
            "Наименование исследуемого образца взятого у обследуемого человека в лаборатории";
        let line = format!("{label}: 5,2 ммоль/л");
        let c = candidate(label, "5,2 ммоль/л", &line);
        assert_eq!(rejecting_rule(&c), Some("implausible_label"));
    }

    #[test]
    fn single_letter_allow_list() {
        let c = candidate("T", "36,6 °C", "T: 36,6 °C");
        assert_eq!(rejecting_rule(&c), None);
        let c = candidate("X", "36,6 °C", "X: 36,6 °C");
        assert_eq!(rejecting_rule(&c), Some("implausible_label"));
    }

    #[test]
    fn unknown_label_accepted_by_default() {
        let c = candidate(
            "Церулоплазмин",
            "0,28 г/л (норма: 0,2 - 0,6)",
            "Церулоплазмин: 0,28 г/л (норма: 0,2 - 0,6)",
        );
        assert_eq!(rejecting_rule(&c), None);
    }

    #[test]
    fn prose_value_under_prose_label_is_a_header() {
        let c = candidate("HGB", "см. бланк", "HGB: см. бланк");
        assert_eq!(rejecting_rule(&c), Some("section_header"));
    }

    #[test]
    fn value_without_digits_or_verdict_rejected() {
        // Label reads like a test name, so the header rule lets it
        // through; the numeric-content rule catches it.
        let c = candidate("Антитела IgG", "сомнительно", "Антитела IgG: сомнительно");
        assert_eq!(rejecting_rule(&c), Some("no_numeric_content"));
    }

    #[test]
    fn value_without_unit_rejected() {
        // The bare number alone gives no unit signal at the filter stage
        let c = candidate("Проба", "12", "Проба: 12");
        assert_eq!(rejecting_rule(&c), Some("no_unit_indicator"));
    }

    #[test]
    fn lab_code_with_full_value_passes() {
        let c = candidate(
            "HGB",
            "163.00 г/л (норма: 130,00 - 160,00)",
            "HGB: 163.00 г/л (норма: 130,00 - 160,00)",
        );
        assert_eq!(rejecting_rule(&c), None);
    }

    #[test]
    fn rule_table_order_is_stable() {
        let names: Vec<&str> = REJECT_RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "datetime_shape",
                "section_header",
                "implausible_label",
                "no_numeric_content",
                "no_unit_indicator",
            ]
        );
    }
}
