//! Top-level extraction pipeline.
//!
//! Every pass runs on every document: the line-oriented extractor over
//! the raw text, the proximity reconstructor over the fragment stream,
//! and any document profile whose indicators match. Their candidate
//! records are merged by canonical metric name, keeping the
//! highest-confidence record per metric in first-seen order, so a metric
//! found by two passes appears once with the better parse.

use std::collections::HashMap;

use crate::profile::{DocumentProfile, KAZAKH_BIOCHEMISTRY};
use crate::proximity::reconstruct_lines;
use crate::structural::extract_from_text;
use crate::types::{ExtractionReport, MetricRecord};
use crate::validate::validate_document;

/// Extraction engine: the pass pipeline plus registered document
/// profiles.
pub struct MetricExtractor {
    profiles: Vec<&'static DocumentProfile>,
}

impl Default for MetricExtractor {
    fn default() -> Self {
        Self {
            profiles: vec![&KAZAKH_BIOCHEMISTRY],
        }
    }
}

impl MetricExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional document profile.
    pub fn with_profile(mut self, profile: &'static DocumentProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// Run the full pipeline over one page of OCR fragments.
    ///
    /// `quality_summary` is an optional caller-provided summary of scan
    /// quality, carried through into the report verbatim.
    pub fn extract_page(
        &self,
        fragments: &[String],
        quality_summary: Option<&str>,
    ) -> ExtractionReport {
        let full_text = fragments.join("\n");
        let metrics = merge_candidates(self.collect_candidates(fragments, &full_text));
        let verdict = validate_document(&metrics, &full_text);

        tracing::info!(
            metrics = metrics.len(),
            valid = verdict.valid,
            "page extraction finished"
        );

        let summary = match quality_summary {
            Some(text) => text.to_string(),
            None => single_page_summary(metrics.len()),
        };

        ExtractionReport {
            metrics,
            verdict,
            summary,
        }
    }

    /// Run the pipeline over a multi-page document: candidates from all
    /// pages are merged once, and the verdict covers the whole document.
    pub fn extract_pages(
        &self,
        pages: &[Vec<String>],
        quality_summary: Option<&str>,
    ) -> ExtractionReport {
        let mut candidates = Vec::new();
        let mut page_texts = Vec::with_capacity(pages.len());

        for (page_num, fragments) in pages.iter().enumerate() {
            let page_text = fragments.join("\n");
            let page_candidates = self.collect_candidates(fragments, &page_text);
            tracing::debug!(
                page = page_num + 1,
                candidates = page_candidates.len(),
                "page candidates collected"
            );
            candidates.extend(page_candidates);
            page_texts.push(page_text);
        }

        let full_text = page_texts.join("\n");
        let metrics = merge_candidates(candidates);
        let verdict = validate_document(&metrics, &full_text);

        tracing::info!(
            pages = pages.len(),
            metrics = metrics.len(),
            valid = verdict.valid,
            "document extraction finished"
        );

        let summary = match quality_summary {
            Some(text) => text.to_string(),
            None => multi_page_summary(pages.len(), metrics.len()),
        };

        ExtractionReport {
            metrics,
            verdict,
            summary,
        }
    }

    /// All candidate records from all passes, in pass order; duplicates
    /// are expected and resolved by the merge.
    fn collect_candidates(&self, fragments: &[String], full_text: &str) -> Vec<MetricRecord> {
        let mut candidates = extract_from_text(full_text);

        let reconstructed = reconstruct_lines(fragments).join("\n");
        candidates.extend(extract_from_text(&reconstructed));

        for profile in &self.profiles {
            if profile.matches(full_text) {
                candidates.extend(profile.extract(fragments));
            }
        }

        candidates
    }
}

/// Merge candidates by canonical name: highest confidence wins, order of
/// first appearance is preserved.
fn merge_candidates(candidates: Vec<MetricRecord>) -> Vec<MetricRecord> {
    let mut merged: Vec<MetricRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in candidates {
        match index.get(&record.name) {
            Some(&slot) => {
                if record.confidence > merged[slot].confidence {
                    merged[slot] = record;
                }
            }
            None => {
                index.insert(record.name.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

fn single_page_summary(metric_count: usize) -> String {
    match metric_count {
        0 => "No health metrics could be extracted from the document.".to_string(),
        1 => "Extracted 1 health metric from the document.".to_string(),
        n => format!("Extracted {n} health metrics from the document."),
    }
}

fn multi_page_summary(page_count: usize, metric_count: usize) -> String {
    format!("Analysis of {page_count} pages: extracted {metric_count} health metrics.")
}
