//! Reconstruction of metric lines from scattered OCR fragments.
//!
//! Table-formatted reports rarely survive OCR as "label: value" lines;
//! the name, value, unit and reference range arrive as separate fragments
//! in reading order. Each pass here looks for an anchor fragment (a
//! tabular test name, a hepatitis marker, a biochemistry analyte, a CBC
//! lab code) and collects the pieces that belong to it from a short forward
//! window, emitting a synthetic structured line the line-oriented
//! extractor already knows how to parse. Already-structured fragments are
//! passed through unchanged unless their label is administrative noise.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::alias;
use crate::value_parser::clean_unit;

/// Forward window after a tabular test-name fragment.
const TABULAR_WINDOW: usize = 8;
/// Forward window after a hepatitis marker fragment.
const HEPATITIS_WINDOW: usize = 6;
/// Row window for a biochemistry analyte, anchor fragment included.
const BIOCHEM_WINDOW: usize = 10;
/// Forward window after a CBC lab code fragment.
const CBC_WINDOW: usize = 6;

static DECIMAL_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.,]\d+$").unwrap());

// Result cell with the unit glued into the same fragment, possibly with
// an OCR-corrupted unit spelling ("5,2 ммолыл"). Unanchored: the number
// may sit inside a longer cell.
static VALUE_WITH_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+[.,]\d+)\s*([а-яА-Яa-zA-Z/%]+)").unwrap());

static ANY_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.,]?\d*$").unwrap());

static INTERVAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.,]?\d*\s*[-–]\s*\d+[.,]?\d*$").unwrap());

static UNIT_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[а-яА-Яa-zA-Z/%]+$").unwrap());

static DATE_CONTAMINATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}\.\d{2}\.\d{4}").unwrap());

static TABULAR_NAME: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)^ттг\d*$").unwrap(),
        Regex::new(r"(?i)^свободный\s+т[з34]\s*\d*$").unwrap(),
        Regex::new(r"(?i)^25.?он\s*витамин\s*d.*$").unwrap(),
        Regex::new(r"(?i)^витамин\s*d\d*$").unwrap(),
        Regex::new(r"(?i)^(гемоглобин|эритроциты|лейкоциты|тромбоциты|гематокрит)$").unwrap(),
        Regex::new(r"(?i)^антитела").unwrap(),
        Regex::new(r"(?i)маркер").unwrap(),
    ]
});

static HEPATITIS_C_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)гепатит\s*[cс]|anti.?hcv").unwrap());

static HEPATITIS_B_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)hbs\s*ag").unwrap());

static NEGATIVE_VERDICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)не\s+обнаружено").unwrap());

static POSITIVE_VERDICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^обнаружено").unwrap());

static SCO_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)s/co\s*=?\s*(\d+[.,]\d+)").unwrap());

static BIOCHEM_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)аланинаминотрансфераза|аспартатаминотрасфераза|^алт$|^аст$|амилаза|фосфатаза|^щф$|ггтп|гамма.?гт|глюкоза|билирубин|креатинин|альбумин|магний|мочевина|мочевая|общий\s+белок|холестерин|лпвп|лпнп|триглицериды|калий|натрий|кальций",
    )
    .unwrap()
});

static CBC_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,5}[#%]?$").unwrap());

// Value continuations for multiline CBC cells: a power-of-ten fragment,
// a unit token, or a parenthesized range belonging to the number before it.
static CBC_CONTINUATION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^10\^?\d+").unwrap(),
        Regex::new(r"^\(").unwrap(),
        Regex::new(r"^[а-яА-Яa-zA-Z/%]+$").unwrap(),
    ]
});

static ADMIN_NOISE: &[&str] = &[
    "пациент",
    "дата",
    "врач",
    "клиника",
    "заявка",
    "забор",
    "биоматериал",
];

/// Rebuild structured lines from an OCR fragment stream.
///
/// Returns synthetic "label: value ..." lines ready for the line-oriented
/// extractor. Every pass runs; the caller deduplicates overlapping finds
/// by canonical name and confidence.
pub fn reconstruct_lines(fragments: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut processed: HashSet<String> = HashSet::new();

    pass_through_structured(fragments, &mut lines);
    reconstruct_tabular_rows(fragments, &mut lines, &mut processed);
    reconstruct_hepatitis(fragments, &mut lines, &mut processed);
    reconstruct_biochemistry(fragments, &mut lines, &mut processed);
    reconstruct_cbc_codes(fragments, &mut lines, &mut processed);

    tracing::debug!(
        fragments = fragments.len(),
        lines = lines.len(),
        "proximity reconstruction finished"
    );
    lines
}

fn forward_window(fragments: &[String], anchor: usize, len: usize) -> &[String] {
    let start = anchor + 1;
    let end = (start + len).min(fragments.len());
    &fragments[start.min(fragments.len())..end]
}

fn is_admin_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    ADMIN_NOISE.iter().any(|w| lower.contains(w))
}

/// A result cell: a bare decimal, or a decimal with its unit glued into
/// the same fragment. Glued units go through the correction table.
fn value_from_fragment(fragment: &str) -> Option<(String, Option<String>)> {
    if let Some(caps) = VALUE_WITH_UNIT.captures(fragment) {
        return Some((caps[1].to_string(), Some(clean_unit(&caps[2]))));
    }
    if DECIMAL_NUMBER.is_match(fragment) {
        return Some((fragment.to_string(), None));
    }
    None
}

/// A standalone unit cell, accepted only when the corrected form reads
/// as a unit.
fn unit_from_fragment(fragment: &str) -> Option<String> {
    if !UNIT_FRAGMENT.is_match(fragment) {
        return None;
    }
    let cleaned = clean_unit(fragment);
    if cleaned.contains('/') || cleaned == "%" || cleaned.to_lowercase() == "сек" {
        return Some(cleaned);
    }
    None
}

/// Fragments that already carry a "label: value" shape go through as-is.
fn pass_through_structured(fragments: &[String], lines: &mut Vec<String>) {
    for fragment in fragments {
        if let Some((label, value)) = fragment.split_once(':') {
            if !label.trim().is_empty() && !value.trim().is_empty() && !is_admin_label(label) {
                lines.push(fragment.trim().to_string());
            }
        }
    }
}

/// Tabular panels (hormones, word-labeled CBC rows) print name, result,
/// unit and the two range bounds in separate table cells; the unit may
/// also arrive glued to the result.
fn reconstruct_tabular_rows(
    fragments: &[String],
    lines: &mut Vec<String>,
    processed: &mut HashSet<String>,
) {
    for (i, fragment) in fragments.iter().enumerate() {
        let name = fragment.trim();
        if !TABULAR_NAME.iter().any(|p| p.is_match(name)) {
            continue;
        }
        let canonical = alias::resolve(name);
        if processed.contains(&canonical) {
            continue;
        }

        let mut value: Option<String> = None;
        let mut unit: Option<String> = None;
        let mut range: Option<String> = None;
        let mut range_bounds: Vec<&str> = Vec::new();

        for candidate in forward_window(fragments, i, TABULAR_WINDOW) {
            let candidate = candidate.trim();
            if DATE_CONTAMINATION.is_match(candidate) {
                continue;
            }
            if value.is_none() {
                if let Some((found, glued_unit)) = value_from_fragment(candidate) {
                    value = Some(found);
                    if unit.is_none() {
                        unit = glued_unit;
                    }
                    continue;
                }
            }
            if unit.is_none() {
                if let Some(found) = unit_from_fragment(candidate) {
                    unit = Some(found);
                    continue;
                }
            }
            if range.is_none() && INTERVAL.is_match(candidate) {
                range = Some(candidate.to_string());
                continue;
            }
            // Range bounds printed as two separate cells after the value.
            if value.is_some() && range.is_none() && ANY_NUMBER.is_match(candidate) {
                range_bounds.push(candidate);
                if range_bounds.len() == 2 {
                    range = Some(format!("{} - {}", range_bounds[0], range_bounds[1]));
                }
            }
        }

        if let (Some(value), Some(unit), Some(range)) = (value, unit, range) {
            lines.push(format!("{name}: {value} {unit} (норма: {range})"));
            processed.insert(canonical);
            tracing::debug!(metric = %name, "reconstructed tabular row");
        }
    }
}

/// Hepatitis serology: marker name, a detection verdict and an S/CO
/// signal-to-cutoff number scattered across neighbouring fragments.
fn reconstruct_hepatitis(
    fragments: &[String],
    lines: &mut Vec<String>,
    processed: &mut HashSet<String>,
) {
    for (i, fragment) in fragments.iter().enumerate() {
        // Skip fragments that already read as full lines.
        if fragment.contains(':') {
            continue;
        }
        let label = if HEPATITIS_B_NAME.is_match(fragment) {
            "HBsAg (гепатит B)"
        } else if HEPATITIS_C_NAME.is_match(fragment) {
            "Гепатит C (суммарные антитела)"
        } else {
            continue;
        };
        let canonical = alias::resolve(label);
        if processed.contains(&canonical) {
            continue;
        }

        let mut verdict: Option<&str> = None;
        let mut sco: Option<String> = None;

        for candidate in forward_window(fragments, i, HEPATITIS_WINDOW) {
            let candidate = candidate.trim();
            if verdict.is_none() {
                if NEGATIVE_VERDICT.is_match(candidate) {
                    verdict = Some("Не обнаружено");
                } else if POSITIVE_VERDICT.is_match(candidate) {
                    verdict = Some("Обнаружено");
                }
            }
            if sco.is_none() {
                if let Some(caps) = SCO_VALUE.captures(candidate) {
                    sco = Some(caps[1].to_string());
                }
            }
        }

        if let (Some(verdict), Some(sco)) = (verdict, sco) {
            lines.push(format!(
                "{label}: {verdict}, S/CO = {sco} (норма: S/CO < 1,0)"
            ));
            processed.insert(canonical);
            tracing::debug!(metric = %label, "reconstructed hepatitis row");
        }
    }
}

/// Biochemistry panels: analyte name followed somewhere in the next rows
/// by a decimal result, a unit and a reference interval.
fn reconstruct_biochemistry(
    fragments: &[String],
    lines: &mut Vec<String>,
    processed: &mut HashSet<String>,
) {
    for (i, fragment) in fragments.iter().enumerate() {
        let name = fragment.trim();
        if name.contains(':') || !BIOCHEM_NAME.is_match(name) {
            continue;
        }
        let canonical = alias::resolve(name);
        if processed.contains(&canonical) {
            continue;
        }

        let mut value: Option<String> = None;
        let mut unit: Option<String> = None;
        let mut range: Option<String> = None;

        // The anchor cell itself may carry the value and glued unit.
        let window_end = (i + BIOCHEM_WINDOW).min(fragments.len());
        for (offset, candidate) in fragments[i..window_end].iter().enumerate() {
            let candidate = candidate.trim();
            if DATE_CONTAMINATION.is_match(candidate) {
                continue;
            }
            // The next analyte name ends this row.
            if offset > 0 && BIOCHEM_NAME.is_match(candidate) {
                break;
            }
            if value.is_none() {
                if let Some((found, glued_unit)) = value_from_fragment(candidate) {
                    value = Some(found);
                    if unit.is_none() {
                        unit = glued_unit;
                    }
                    continue;
                }
            }
            if unit.is_none() {
                if let Some(found) = unit_from_fragment(candidate) {
                    unit = Some(found);
                    continue;
                }
            }
            if range.is_none()
                && (INTERVAL.is_match(candidate) || candidate.starts_with('<'))
            {
                range = Some(candidate.to_string());
            }
        }

        // Rows with no unit cell at all are dropped; template profiles
        // cover the layouts that lose their unit column.
        if let (Some(value), Some(unit)) = (value, unit) {
            let line = match range {
                Some(range) => format!("{name}: {value} {unit} (норма: {range})"),
                None => format!("{name}: {value} {unit}"),
            };
            lines.push(line);
            processed.insert(canonical);
            tracing::debug!(metric = %name, "reconstructed biochemistry row");
        }
    }
}

/// CBC analyzers print the lab code in one cell and the value in the
/// next, sometimes split again around a power-of-ten multiplier.
fn reconstruct_cbc_codes(
    fragments: &[String],
    lines: &mut Vec<String>,
    processed: &mut HashSet<String>,
) {
    for (i, fragment) in fragments.iter().enumerate() {
        let code = fragment.trim();
        if !CBC_CODE.is_match(code) {
            continue;
        }
        let canonical = alias::resolve(code);
        if processed.contains(&canonical) {
            continue;
        }

        let mut parts: Vec<&str> = Vec::new();
        for candidate in forward_window(fragments, i, CBC_WINDOW) {
            let candidate = candidate.trim();
            if CBC_CODE.is_match(candidate) {
                break;
            }
            if parts.is_empty() {
                if candidate.starts_with(|c: char| c.is_ascii_digit()) {
                    parts.push(candidate);
                }
                continue;
            }
            if CBC_CONTINUATION.iter().any(|p| p.is_match(candidate)) {
                parts.push(candidate);
            } else {
                break;
            }
        }

        if !parts.is_empty() {
            lines.push(format!("{code}: {}", parts.join(" ")));
            processed.insert(canonical);
            tracing::debug!(metric = %code, "reconstructed lab-code row");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn hormone_row_reassembled() {
        let fragments = frags(&["ТТГ", "1,85", "мкМЕ/мл", "0,4", "4,0"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(&"ТТГ: 1,85 мкМЕ/мл (норма: 0,4 - 4,0)".to_string()));
    }

    #[test]
    fn hormone_row_with_interval_cell() {
        let fragments = frags(&["Свободный Т4", "15,3", "пмоль/л", "9,0 - 19,1"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(&"Свободный Т4: 15,3 пмоль/л (норма: 9,0 - 19,1)".to_string()));
    }

    #[test]
    fn hepatitis_row_reassembled() {
        let fragments = frags(&[
            "Гепатит C (суммарные антитела)",
            "Не обнаружено",
            "S/CO = 0,13",
        ]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(
            &"Гепатит C (суммарные антитела): Не обнаружено, S/CO = 0,13 (норма: S/CO < 1,0)"
                .to_string()
        ));
    }

    #[test]
    fn hbsag_row_gets_its_own_label() {
        let fragments = frags(&["HBsAg", "Не обнаружено", "S/CO = 0,28"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(
            &"HBsAg (гепатит B): Не обнаружено, S/CO = 0,28 (норма: S/CO < 1,0)".to_string()
        ));
    }

    #[test]
    fn hepatitis_without_sco_not_invented() {
        let fragments = frags(&["Гепатит C", "Не обнаружено"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.is_empty());
    }

    #[test]
    fn biochemistry_row_reassembled() {
        let fragments = frags(&["Аланинаминотрансфераза (АЛТ)", "23,4", "Ед/л", "3 - 45"]);
        let lines = reconstruct_lines(&fragments);
        assert!(
            lines.contains(&"Аланинаминотрансфераза (АЛТ): 23,4 Ед/л (норма: 3 - 45)".to_string())
        );
    }

    #[test]
    fn glued_value_and_unit_in_one_cell() {
        let fragments = frags(&["ТТГ1", "1,33 мкМЕ/мл", "0,4", "4,0"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(&"ТТГ1: 1,33 мкМЕ/мл (норма: 0,4 - 4,0)".to_string()));
    }

    #[test]
    fn corrupted_glued_unit_corrected() {
        let fragments = frags(&["Глюкоза", "5,2 ммолыл", "3,05 - 6,4"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(&"Глюкоза: 5,2 ммоль/л (норма: 3,05 - 6,4)".to_string()));
    }

    #[test]
    fn corrupted_standalone_unit_cell_corrected() {
        let fragments = frags(&["Глюкоза", "5,2", "ммолыл", "3,05 - 6,4"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(&"Глюкоза: 5,2 ммоль/л (норма: 3,05 - 6,4)".to_string()));
    }

    #[test]
    fn word_labeled_cbc_row_reassembled() {
        let fragments = frags(&["Гемоглобин", "145,0 г/л", "130,0 - 160,0"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(&"Гемоглобин: 145,0 г/л (норма: 130,0 - 160,0)".to_string()));
    }

    #[test]
    fn biochemistry_row_without_unit_not_emitted() {
        // No unit cell anywhere in the row: the grouping is not trusted,
        // and no default unit is invented for the analyte.
        let fragments = frags(&["Глюкоза", "5,2", "3,05 - 6,4"]);
        let lines = reconstruct_lines(&fragments);
        assert!(!lines.iter().any(|l| l.starts_with("Глюкоза:")));
    }

    #[test]
    fn biochemistry_stops_at_next_analyte() {
        // Glucose's window must not steal bilirubin's value
        let fragments = frags(&["Глюкоза", "Билирубин общий", "14,2", "мкмоль/л"]);
        let lines = reconstruct_lines(&fragments);
        assert!(!lines.iter().any(|l| l.starts_with("Глюкоза:")));
        assert!(lines
            .contains(&"Билирубин общий: 14,2 мкмоль/л".to_string()));
    }

    #[test]
    fn date_contaminated_cells_skipped() {
        let fragments = frags(&["Креатинин", "26.04.2025", "78,5", "мкмоль/л"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(&"Креатинин: 78,5 мкмоль/л".to_string()));
    }

    #[test]
    fn cbc_code_with_split_multiplier() {
        let fragments = frags(&["RBC", "5.66", "10^12/л", "WBC", "6.24", "10^9/л"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(&"RBC: 5.66 10^12/л".to_string()));
        assert!(lines.contains(&"WBC: 6.24 10^9/л".to_string()));
    }

    #[test]
    fn cbc_code_value_and_range() {
        let fragments = frags(&["HGB", "163.00 г/л", "(норма: 130,00 - 160,00)"]);
        let lines = reconstruct_lines(&fragments);
        assert!(lines.contains(&"HGB: 163.00 г/л (норма: 130,00 - 160,00)".to_string()));
    }

    #[test]
    fn structured_fragments_pass_through() {
        let fragments = frags(&[
            "Глюкоза: 5,2 ммоль/л (норма: 3,05 - 6,4)",
            "Пациент: Иванов И.И.",
            "Дата забора: 26.04.2025",
        ]);
        let lines = reconstruct_lines(&fragments);
        assert_eq!(lines, vec!["Глюкоза: 5,2 ммоль/л (норма: 3,05 - 6,4)"]);
    }

    #[test]
    fn duplicate_anchor_reconstructed_once() {
        let fragments = frags(&["ТТГ", "1,85", "мкМЕ/мл", "0,4", "4,0", "ТТГ1", "2,0"]);
        let lines = reconstruct_lines(&fragments);
        let ttg_lines = lines.iter().filter(|l| l.starts_with("ТТГ")).count();
        assert_eq!(ttg_lines, 1);
    }
}
