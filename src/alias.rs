//! Canonical naming for lab metrics.
//!
//! Lab reports spell the same measurement many ways: instrument codes
//! (HGB, PLT), full Russian names, Kazakh-form variants, Latin
//! abbreviations. `resolve` folds all of them onto one canonical
//! lowercase identifier so records from different extraction passes can
//! be deduplicated. Pure function over static tables.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Surface form (uppercased) → canonical identifier.
static METRIC_ALIASES: &[(&str, &str)] = &[
    // Complete blood count instrument codes
    ("HGB", "hemoglobin"),
    ("RBC", "red_blood_cells"),
    ("PLT", "platelets"),
    ("WBC", "white_blood_cells"),
    ("NEU#", "neutrophils_absolute"),
    ("LYM#", "lymphocytes_absolute"),
    ("MON#", "monocytes_absolute"),
    ("EOS#", "eosinophils_absolute"),
    ("BAS#", "basophils_absolute"),
    ("NEU%", "neutrophils_percentage"),
    ("LYM%", "lymphocytes_percentage"),
    ("MON%", "monocytes_percentage"),
    ("EOS%", "eosinophils_percentage"),
    ("BAS%", "basophils_percentage"),
    ("MCV", "mean_corpuscular_volume"),
    ("MCH", "mean_corpuscular_hemoglobin"),
    ("MCHC", "mean_corpuscular_hemoglobin_concentration"),
    ("RDW", "red_cell_distribution_width"),
    ("PCT", "plateletcrit"),
    ("MPV", "mean_platelet_volume"),
    ("PDW", "platelet_distribution_width"),
    ("P-LCR", "platelet_large_cell_ratio"),
    ("HCT", "hematocrit"),
    // Word-labeled CBC rows
    ("ГЕМОГЛОБИН", "hemoglobin"),
    ("ЭРИТРОЦИТЫ", "red_blood_cells"),
    ("ЛЕЙКОЦИТЫ", "white_blood_cells"),
    ("ТРОМБОЦИТЫ", "platelets"),
    ("ГЕМАТОКРИТ", "hematocrit"),
    ("СОЭ", "erythrocyte_sedimentation_rate"),
    // Biochemistry (Russian, with Kazakh-form spellings)
    ("ОБЩИЙ БЕЛОК", "total_protein"),
    ("БЕЛОК", "total_protein"),
    ("АЛЬБУМИН", "albumin"),
    ("КРЕАТИНИН", "creatinine"),
    ("ГЛЮКОЗА", "glucose"),
    ("ГЛЮКОЗА (САХАР КРОВИ)", "glucose"),
    ("МАГНИЙ", "magnesium"),
    ("АЛТ", "alt_alanine_aminotransferase"),
    ("АЛАТ", "alt_alanine_aminotransferase"),
    ("АЛАНИНАМИНОТРАНСФЕРАЗА", "alt_alanine_aminotransferase"),
    ("АЛАНИНАМИНОТРАНСФЕРАЗА (АЛТ)", "alt_alanine_aminotransferase"),
    ("АСТ", "ast_aspartate_aminotransferase"),
    ("АСАТ", "ast_aspartate_aminotransferase"),
    ("АСПАРТАТАМИНОТРАСФЕРАЗА", "ast_aspartate_aminotransferase"),
    ("АСПАРТАТАМИНОТРАСФЕРАЗА (АСТ)", "ast_aspartate_aminotransferase"),
    ("БИЛИРУБИН ОБЩИЙ", "total_bilirubin"),
    ("БИЛИРУБИН ПРЯМОЙ", "direct_bilirubin"),
    ("БИЛИРУБИН НЕПРЯМОЙ", "indirect_bilirubin"),
    ("БИЛИРУБИН КОНЪЮГИРОВАННЫЙ", "direct_bilirubin"),
    ("БИЛИРУБИН НЕКОНЪЮГИРОВАННЫЙ", "indirect_bilirubin"),
    ("ГГТ", "gamma_glutamyl_transferase"),
    ("ГГТП", "gamma_glutamyl_transferase"),
    ("ГАММА-ГТ", "gamma_glutamyl_transferase"),
    ("ГАММАГЛЮТАМИЛТРАНСФЕРАЗА", "gamma_glutamyl_transferase"),
    ("ГАММАГЛЮТАМИЛТРАНСФЕРАЗА (ГГТП)", "gamma_glutamyl_transferase"),
    ("ЩЕЛОЧНАЯ ФОСФАТАЗА", "alkaline_phosphatase"),
    ("ЩЕЛОЧНАЯ ФОСФАТАЗА (ЩФ)", "alkaline_phosphatase"),
    ("ЩФ", "alkaline_phosphatase"),
    ("ГЛИКИРОВАННЫЙ ГЕМОГЛОБИН", "glycated_hemoglobin"),
    ("ГЛИКОЗИЛИРОВАННЫЙ ГЕМОГЛОБИН", "glycated_hemoglobin"),
    ("HBA1C", "glycated_hemoglobin"),
    ("С-РЕАКТИВНЫЙ БЕЛОК", "c_reactive_protein"),
    ("CRP", "c_reactive_protein"),
    ("СРБ", "c_reactive_protein"),
    ("ХОЛЕСТЕРИН ОБЩИЙ", "total_cholesterol"),
    ("ХОЛЕСТЕРИН", "total_cholesterol"),
    ("ХОЛЕСТЕРИН ЛПВП", "hdl_cholesterol"),
    ("HDL", "hdl_cholesterol"),
    ("ЛПВП", "hdl_cholesterol"),
    ("ХОЛЕСТЕРИН ЛПНП", "ldl_cholesterol"),
    ("LDL", "ldl_cholesterol"),
    ("ЛПНП", "ldl_cholesterol"),
    ("ХОЛЕСТЕРИН ЛПОНП", "vldl_cholesterol"),
    ("ЛПОНП", "vldl_cholesterol"),
    ("ТРИГЛИЦЕРИДЫ", "triglycerides"),
    ("КАЛИЙ", "potassium"),
    ("НАТРИЙ", "sodium"),
    ("МОЧЕВИНА", "urea"),
    ("КАЛЬЦИЙ", "calcium"),
    ("МОЧЕВАЯ КИСЛОТА", "uric_acid"),
    ("АМИЛАЗА", "amylase"),
    ("АЛЬФА-АМИЛАЗА", "alpha_amylase"),
    // Hormones
    ("ТТГ", "thyroid_stimulating_hormone"),
    ("TSH", "thyroid_stimulating_hormone"),
    ("СВОБОДНЫЙ Т3", "free_t3"),
    ("FT3", "free_t3"),
    ("СВОБОДНЫЙ Т4", "free_t4"),
    ("FT4", "free_t4"),
    ("25-ОН ВИТАМИН D", "vitamin_d_25_oh"),
    ("ВИТАМИН D", "vitamin_d_25_oh"),
    ("25(OH)D", "vitamin_d_25_oh"),
    // Coagulation panel
    ("АЧТВ", "activated_partial_thromboplastin_time"),
    ("АПТВ", "activated_partial_thromboplastin_time"),
    ("МНО", "international_normalized_ratio"),
    ("INR", "international_normalized_ratio"),
    ("ПРОТРОМБИНОВОЕ ВРЕМЯ", "prothrombin_time"),
    ("ПВ", "prothrombin_time"),
    ("ТРОМБИНОВОЕ ВРЕМЯ", "thrombin_time"),
    ("ТВ", "thrombin_time"),
    ("ПРОТРОМБИНОВЫЙ ИНДЕКС", "prothrombin_index"),
    ("ПТИ", "prothrombin_index"),
    ("ФИБРИНОГЕН", "fibrinogen"),
    // Viral hepatitis markers (Latin and Cyrillic "C")
    ("АНТИТЕЛА К ГЕПАТИТУ C", "hepatitis_c_antibodies"),
    ("АНТИТЕЛА К ГЕПАТИТУ С", "hepatitis_c_antibodies"),
    ("ANTI-HCV", "hepatitis_c_antibodies"),
    ("HCV", "hepatitis_c_antibodies"),
    ("HBSAG", "hepatitis_b_surface_antigen"),
    ("HBS AG", "hepatitis_b_surface_antigen"),
    ("ГЕПАТИТ B", "hepatitis_b_surface_antigen"),
    ("HBSAG (ГЕПАТИТ B)", "hepatitis_b_surface_antigen"),
    ("ГЕПАТИТ C (СУММАРНЫЕ АНТИТЕЛА)", "hepatitis_c_total_antibodies"),
    ("ГЕПАТИТ С (СУММАРНЫЕ АНТИТЕЛА)", "hepatitis_c_total_antibodies"),
];

/// Secondary table of abbreviation variants, tried after the direct lookup
/// misses. Values are keys of the primary table.
static ABBREVIATION_VARIANTS: &[(&str, &str)] = &[
    ("АЛАТ", "АЛТ"),
    ("АСАТ", "АСТ"),
    ("ГГТП", "ГГТ"),
    ("ГАММА-ГТ", "ГГТ"),
    ("ГАММА ГТ", "ГГТ"),
    ("ЩФ", "ЩЕЛОЧНАЯ ФОСФАТАЗА"),
    ("СРБ", "С-РЕАКТИВНЫЙ БЕЛОК"),
    ("CRP", "С-РЕАКТИВНЫЙ БЕЛОК"),
    ("ЛПВП", "ХОЛЕСТЕРИН ЛПВП"),
    ("ЛПНП", "ХОЛЕСТЕРИН ЛПНП"),
    ("HDL", "ХОЛЕСТЕРИН ЛПВП"),
    ("LDL", "ХОЛЕСТЕРИН ЛПНП"),
    ("TSH", "ТТГ"),
    ("FT3", "СВОБОДНЫЙ Т3"),
    ("FT4", "СВОБОДНЫЙ Т4"),
    ("HBA1C", "ГЛИКИРОВАННЫЙ ГЕМОГЛОБИН"),
    ("INR", "МНО"),
    ("АПТВ", "АЧТВ"),
    ("ПВ", "ПРОТРОМБИНОВОЕ ВРЕМЯ"),
    ("ТВ", "ТРОМБИНОВОЕ ВРЕМЯ"),
    ("ПТИ", "ПРОТРОМБИНОВЫЙ ИНДЕКС"),
    ("ANTI-HCV", "АНТИТЕЛА К ГЕПАТИТУ C"),
    ("HCV", "АНТИТЕЛА К ГЕПАТИТУ C"),
    ("HBS AG", "HBSAG"),
    ("25(OH)D", "25-ОН ВИТАМИН D"),
    ("ВИТАМИН D", "25-ОН ВИТАМИН D"),
];

/// Compound names resolved against the label as written, before prefix and
/// suffix stripping would collapse them (e.g. "БИЛИРУБИН ПРЯМОЙ" must not
/// degrade to plain bilirubin).
static COMPOUND_NAMES: &[&str] = &[
    "БИЛИРУБИН КОНЪЮГИРОВАННЫЙ",
    "БИЛИРУБИН НЕКОНЪЮГИРОВАННЫЙ",
    "БИЛИРУБИН НЕПРЯМОЙ",
    "БИЛИРУБИН ОБЩИЙ",
    "БИЛИРУБИН ПРЯМОЙ",
    "ХОЛЕСТЕРИН ЛПОНП",
    "ХОЛЕСТЕРИН ЛПВП",
    "ХОЛЕСТЕРИН ЛПНП",
    "ХОЛЕСТЕРИН ОБЩИЙ",
    "ГЛИКИРОВАННЫЙ ГЕМОГЛОБИН",
    "ГЛИКОЗИЛИРОВАННЫЙ ГЕМОГЛОБИН",
    "С-РЕАКТИВНЫЙ БЕЛОК",
    "ЩЕЛОЧНАЯ ФОСФАТАЗА",
    "ПРОТРОМБИНОВОЕ ВРЕМЯ",
    "ТРОМБИНОВОЕ ВРЕМЯ",
    "ПРОТРОМБИНОВЫЙ ИНДЕКС",
    "АНТИТЕЛА К ГЕПАТИТУ C",
    "АНТИТЕЛА К ГЕПАТИТУ С",
    "25-ОН ВИТАМИН D",
    "СВОБОДНЫЙ Т3",
    "СВОБОДНЫЙ Т4",
];

static ALIAS_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| METRIC_ALIASES.iter().copied().collect());

/// OCR tabular artifacts: column counters glued to hormone names
/// ("ТТГ1"), the digit 3 read as Cyrillic З, trailing garbage after
/// "ВИТАМИН D".
static TABULAR_ARTIFACTS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"^ТТГ\d*$").unwrap(), "ТТГ"),
        (Regex::new(r"СВОБОДНЫЙ\s+Т[З3]\s*\d*").unwrap(), "СВОБОДНЫЙ Т3"),
        (Regex::new(r"СВОБОДНЫЙ\s+Т4\s*\d*").unwrap(), "СВОБОДНЫЙ Т4"),
        (
            Regex::new(r"25.?[ОO][НH]?\s*ВИТАМИН\s+D[A-ZА-Я]*").unwrap(),
            "25-ОН ВИТАМИН D",
        ),
    ]
});

static FREE_HORMONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"СВОБОДНЫЙ\s+Т[34]").unwrap());
static LEADING_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(ОБЩИЙ\s+|СВОБОДНЫЙ\s+)").unwrap());
static TRAILING_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+(ОБЩИЙ|ПРЯМОЙ|НЕПРЯМОЙ|КОНЪЮГИРОВАННЫЙ|НЕКОНЪЮГИРОВАННЫЙ)$").unwrap()
});

/// Resolve a raw detected label to its canonical metric name.
///
/// Case-insensitive; strips qualifier prefixes/suffixes and count-mode
/// suffixes (`#`, `%`); falls through the abbreviation-variant table; and
/// finally falls back to a normalized form of the raw label (lowercased,
/// spaces and dashes joined with underscores) so unrecognized but
/// legitimate metrics still get a stable identifier.
pub fn resolve(raw_name: &str) -> String {
    let upper = raw_name.trim().to_uppercase();

    // Compound names win before stripping can mangle them.
    for compound in COMPOUND_NAMES {
        if upper.contains(compound) {
            if let Some(canonical) = ALIAS_MAP.get(compound) {
                return (*canonical).to_string();
            }
        }
    }

    let mut clean = upper.clone();
    for (artifact, replacement) in TABULAR_ARTIFACTS.iter() {
        if artifact.is_match(&clean) {
            clean = (*replacement).to_string();
            break;
        }
    }

    // "СВОБОДНЫЙ" is load-bearing for free hormones; everywhere else the
    // qualifier prefixes carry no meaning for identity.
    if !FREE_HORMONE.is_match(&clean) {
        clean = LEADING_QUALIFIER.replace(&clean, "").into_owned();
    }
    clean = TRAILING_QUALIFIER.replace(&clean, "").into_owned();
    let clean = clean.trim().to_string();

    if let Some(canonical) = ALIAS_MAP.get(clean.as_str()) {
        return (*canonical).to_string();
    }

    // Count-mode suffix variants: "NEU" for "NEU#", percentage markers.
    for suffix in ["#", "%", "_ABS", "_PCT"] {
        if let Some(base) = clean.strip_suffix(suffix) {
            if let Some(canonical) = ALIAS_MAP.get(base) {
                return (*canonical).to_string();
            }
        }
    }

    for (variant, primary) in ABBREVIATION_VARIANTS {
        if clean == *variant {
            if let Some(canonical) = ALIAS_MAP.get(primary) {
                return (*canonical).to_string();
            }
        }
    }

    normalized_fallback(&clean)
}

/// Stable identifier for labels the tables do not know.
fn normalized_fallback(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_codes_resolve() {
        assert_eq!(resolve("HGB"), "hemoglobin");
        assert_eq!(resolve("hgb"), "hemoglobin");
        assert_eq!(resolve("RBC"), "red_blood_cells");
        assert_eq!(resolve("P-LCR"), "platelet_large_cell_ratio");
    }

    #[test]
    fn russian_names_resolve_case_insensitively() {
        assert_eq!(resolve("Глюкоза"), "glucose");
        assert_eq!(resolve("КРЕАТИНИН"), "creatinine");
        assert_eq!(resolve("Антитела к гепатиту C"), "hepatitis_c_antibodies");
    }

    #[test]
    fn abbreviation_variants_fall_through() {
        assert_eq!(resolve("АЛАТ"), "alt_alanine_aminotransferase");
        assert_eq!(resolve("ГГТП"), "gamma_glutamyl_transferase");
        assert_eq!(resolve("TSH"), "thyroid_stimulating_hormone");
        assert_eq!(resolve("ЩФ"), "alkaline_phosphatase");
    }

    #[test]
    fn qualifier_prefixes_stripped() {
        assert_eq!(resolve("Общий белок"), "total_protein");
        // "ОБЩИЙ БЕЛОК" is also a direct key; exercise a pure prefix case
        assert_eq!(resolve("ОБЩИЙ ХОЛЕСТЕРИН"), "total_cholesterol");
    }

    #[test]
    fn free_hormones_keep_their_qualifier() {
        assert_eq!(resolve("Свободный Т3"), "free_t3");
        assert_eq!(resolve("Свободный Т4"), "free_t4");
    }

    #[test]
    fn bilirubin_compounds_stay_distinct() {
        assert_eq!(resolve("Билирубин общий"), "total_bilirubin");
        assert_eq!(resolve("Билирубин прямой"), "direct_bilirubin");
        assert_eq!(resolve("Билирубин непрямой"), "indirect_bilirubin");
        assert_eq!(resolve("Билирубин конъюгированный"), "direct_bilirubin");
    }

    #[test]
    fn tabular_artifacts_cleaned() {
        assert_eq!(resolve("ТТГ1"), "thyroid_stimulating_hormone");
        assert_eq!(resolve("СВОБОДНЫЙ ТЗ2"), "free_t3");
        assert_eq!(resolve("Свободный Т4 3"), "free_t4");
    }

    #[test]
    fn t4_not_collapsed_into_t3() {
        assert_eq!(resolve("СВОБОДНЫЙ Т4"), "free_t4");
    }

    #[test]
    fn word_labeled_cbc_names_share_codes() {
        // Word-labeled rows must deduplicate against instrument-code rows.
        assert_eq!(resolve("Гемоглобин"), resolve("HGB"));
        assert_eq!(resolve("Эритроциты"), resolve("RBC"));
        assert_eq!(resolve("Лейкоциты"), resolve("WBC"));
        assert_eq!(resolve("Тромбоциты"), resolve("PLT"));
        assert_eq!(resolve("Гематокрит"), resolve("HCT"));
        // But compound hemoglobin names keep their own identity.
        assert_eq!(resolve("Гликированный гемоглобин"), "glycated_hemoglobin");
    }

    #[test]
    fn count_mode_suffixes() {
        assert_eq!(resolve("NEU#"), "neutrophils_absolute");
        assert_eq!(resolve("LYM%"), "lymphocytes_percentage");
        // Stripped-suffix variant of a bare code
        assert_eq!(resolve("HGB#"), "hemoglobin");
    }

    #[test]
    fn unknown_names_get_normalized_fallback() {
        assert_eq!(resolve("Some New Marker"), "some_new_marker");
        assert_eq!(resolve("Альфа-фетопротеин"), "альфа_фетопротеин");
    }

    #[test]
    fn cyrillic_hepatitis_c_variant() {
        // OCR often reads the Latin "C" as Cyrillic "С"
        assert_eq!(resolve("Антитела к гепатиту С"), "hepatitis_c_antibodies");
        assert_eq!(
            resolve("Гепатит C (суммарные антитела)"),
            "hepatitis_c_total_antibodies"
        );
    }
}
