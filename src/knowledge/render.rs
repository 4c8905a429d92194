//! Plain-text document rendering for the vector index.
//!
//! The retrieval model sees these documents verbatim, so the wording
//! matters: each metric carries an explicit status line the model can
//! quote, and abnormal values are repeated in a summary block.

use std::fmt::Write;

use crate::models::{HealthMetric, LabTest};

/// Formats a float the way it was entered: no trailing ".0" noise.
fn num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Full lab-test document: header, numbered metric blocks, abnormal
/// summary.
pub fn render_lab_test_document(lab_test: &LabTest, metrics: &[HealthMetric]) -> String {
    let mut text = String::from("=== LAB TEST ANALYSIS ===\n\n");
    let _ = writeln!(text, "Test Date: {}", lab_test.test_date);
    if let Some(test_type) = &lab_test.test_type {
        let _ = writeln!(text, "Test Type: {test_type}");
    }
    if let Some(clinic) = &lab_test.clinic_name {
        let _ = writeln!(text, "Clinic: {clinic}");
    }
    if let Some(notes) = &lab_test.notes {
        let _ = writeln!(text, "General Notes: {notes}");
    }

    let _ = write!(text, "\n=== METRICS ({} total) ===\n\n", metrics.len());

    for (index, metric) in metrics.iter().enumerate() {
        let _ = writeln!(text, "{}. {}:", index + 1, metric.metric_name);
        let _ = writeln!(text, "   Value: {} {}", num(metric.value), metric.unit);
        if let (Some(min), Some(max)) = (metric.reference_min, metric.reference_max) {
            let _ = writeln!(
                text,
                "   Reference Range: {}-{} {}",
                num(min),
                num(max),
                metric.unit
            );
            if metric.value < min {
                text.push_str("   ⚠️ Status: BELOW NORMAL (Low)\n");
            } else if metric.value > max {
                text.push_str("   ⚠️ Status: ABOVE NORMAL (High)\n");
            } else {
                text.push_str("   ✓ Status: Within Normal Range\n");
            }
        }
        if let Some(notes) = &metric.notes {
            let _ = writeln!(text, "   Notes: {notes}");
        }
        text.push('\n');
    }

    let abnormal: Vec<&HealthMetric> = metrics.iter().filter(|m| is_abnormal(m)).collect();
    if !abnormal.is_empty() {
        text.push_str("=== SUMMARY ===\n");
        let _ = writeln!(
            text,
            "Total abnormal values: {} out of {}",
            abnormal.len(),
            metrics.len()
        );
        text.push_str("Abnormal metrics:\n");
        for m in &abnormal {
            let status = if m.value < m.reference_min.unwrap_or(0.0) {
                "LOW"
            } else {
                "HIGH"
            };
            let _ = writeln!(text, "  - {}: {status}", m.metric_name);
        }
    }

    text
}

/// Standalone metric document (weight, temperature and the like).
pub fn render_metric_document(metric: &HealthMetric) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Medical metric: {}", metric.metric_name);
    let _ = writeln!(text, "Value: {} {}", num(metric.value), metric.unit);
    let _ = writeln!(text, "Date: {}", metric.record_date);

    if let (Some(min), Some(max)) = (metric.reference_min, metric.reference_max) {
        let _ = writeln!(text, "Reference range: {}-{} {}", num(min), num(max), metric.unit);
        if metric.value < min {
            text.push_str("Status: Below normal range (low)\n");
        } else if metric.value > max {
            text.push_str("Status: Above normal range (high)\n");
        } else {
            text.push_str("Status: Within normal range\n");
        }
    }
    if let Some(notes) = &metric.notes {
        let _ = writeln!(text, "Notes: {notes}");
    }
    text
}

/// Abnormal means both bounds known and the value outside them. A
/// metric with a one-sided or missing range is never flagged.
fn is_abnormal(metric: &HealthMetric) -> bool {
    match (metric.reference_min, metric.reference_max) {
        (Some(min), Some(max)) => metric.value < min || metric.value > max,
        _ => false,
    }
}

/// File name the document is uploaded under.
pub fn lab_test_file_name(lab_test: &LabTest) -> String {
    format!(
        "lab_test_{}_{}.txt",
        lab_test.test_date,
        lab_test.test_type.as_deref().unwrap_or("test")
    )
}

pub fn metric_file_name(metric: &HealthMetric) -> String {
    format!("metric_{}_{}.txt", metric.record_date, metric.metric_name)
}
