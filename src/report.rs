use std::cmp::Ordering;

use serde::Serialize;

use crate::error::DurationError;
use crate::types::{build_timeline, DurationOutcome, PhonemeTiming};

pub const SCHEMA_VERSION: u32 = 1;

const OUTLIER_TOP_N: usize = 20;
const SUM_TOLERANCE_MS: f64 = 1.0;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub schema_version: u32,
    pub meta: Meta,
    pub utterances: Vec<UtteranceReport>,
    pub aggregates: AggregateReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub generated_at: String,
    pub strategy: String,
    pub dictionary: String,
    pub spectral: SpectralSummary,
    pub case_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpectralSummary {
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub energy_factor_min: f64,
    pub energy_factor_max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UtteranceReport {
    pub id: String,
    pub duration_ms: u64,
    pub phoneme_count: u32,
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    /// Signed `sum(durations) - duration`, in milliseconds.
    pub sum_error_ms: f32,
    pub min_phoneme_ms: Option<f32>,
    pub timings: Vec<PhonemeTiming>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub counts: AggregateCounts,
    pub mean_phoneme_duration_ms: Option<f32>,
    pub phoneme_duration_ms: Option<MetricDistribution>,
    pub abs_sum_error_ms: Option<MetricDistribution>,
    pub worst_abs_sum_error_ms: Vec<OutlierEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateCounts {
    pub utterances: u32,
    pub phonemes: u32,
    pub fallbacks: u32,
    pub sum_mismatches: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricDistribution {
    pub mean: f32,
    pub p50: f32,
    pub p90: f32,
    pub p99: f32,
    pub max: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierEntry {
    pub id: String,
    pub value: f32,
}

pub fn compute_utterance_report(
    id: &str,
    phonemes: &[String],
    outcome: &DurationOutcome,
    audio_duration_s: f64,
) -> Result<UtteranceReport, DurationError> {
    let mut notes = Vec::new();
    if phonemes.len() != outcome.durations.len() {
        notes.push(format!(
            "length_mismatch:phonemes={} durations={}",
            phonemes.len(),
            outcome.durations.len()
        ));
    }
    if phonemes.is_empty() {
        notes.push("no_phonemes".to_string());
    }

    let sum_s: f64 = outcome.durations.iter().sum();
    let sum_error_ms = (sum_s - audio_duration_s) * 1000.0;
    if sum_error_ms.abs() > SUM_TOLERANCE_MS {
        notes.push("sum_mismatch".to_string());
    }
    let non_positive = outcome.durations.iter().filter(|&&d| d <= 0.0).count();
    if non_positive > 0 {
        notes.push(format!("non_positive_durations={non_positive}"));
    }

    let min_phoneme_ms = outcome
        .durations
        .iter()
        .copied()
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|d| narrow_ms(d * 1000.0, "utterance.min_phoneme_ms"))
        .transpose()?;

    Ok(UtteranceReport {
        id: id.to_string(),
        duration_ms: (audio_duration_s.max(0.0) * 1000.0).round() as u64,
        phoneme_count: saturating_count(phonemes.len()),
        used_fallback: outcome.used_fallback(),
        fallback_reason: outcome.fallback.clone(),
        sum_error_ms: narrow_ms(sum_error_ms, "utterance.sum_error_ms")?,
        min_phoneme_ms,
        timings: build_timeline(phonemes, &outcome.durations),
        notes,
    })
}

pub fn aggregate_reports(utterances: &[UtteranceReport]) -> AggregateReport {
    let phoneme_ms: Vec<f64> = utterances
        .iter()
        .flat_map(|utterance| utterance.timings.iter())
        .map(|timing| timing.duration_s * 1000.0)
        .collect();
    let abs_sum_error_ms: Vec<f64> = utterances
        .iter()
        .map(|utterance| (utterance.sum_error_ms as f64).abs())
        .collect();

    let phoneme_duration_ms = distribution_or_none(&phoneme_ms);
    AggregateReport {
        counts: AggregateCounts {
            utterances: saturating_count(utterances.len()),
            phonemes: saturating_count(phoneme_ms.len()),
            fallbacks: saturating_count(utterances.iter().filter(|u| u.used_fallback).count()),
            sum_mismatches: saturating_count(
                abs_sum_error_ms
                    .iter()
                    .filter(|&&e| e > SUM_TOLERANCE_MS)
                    .count(),
            ),
        },
        mean_phoneme_duration_ms: phoneme_duration_ms.as_ref().map(|d| d.mean),
        phoneme_duration_ms,
        abs_sum_error_ms: distribution_or_none(&abs_sum_error_ms),
        worst_abs_sum_error_ms: ranked_outliers(utterances, OUTLIER_TOP_N, |utterance| {
            (utterance.sum_error_ms as f64).abs()
        }),
    }
}

fn ranked_outliers(
    utterances: &[UtteranceReport],
    top_n: usize,
    metric: impl Fn(&UtteranceReport) -> f64,
) -> Vec<OutlierEntry> {
    let mut entries: Vec<OutlierEntry> = utterances
        .iter()
        .map(|utterance| OutlierEntry {
            id: utterance.id.clone(),
            value: metric(utterance) as f32,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    entries.truncate(top_n);
    entries
}

fn distribution_or_none(values: &[f64]) -> Option<MetricDistribution> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let max = *sorted.last()?;
    let average = sorted.iter().sum::<f64>() / sorted.len() as f64;

    Some(MetricDistribution {
        mean: narrow_ms(average, "aggregate.mean").ok()?,
        p50: narrow_ms(quantile(&sorted, 0.5), "aggregate.p50").ok()?,
        p90: narrow_ms(quantile(&sorted, 0.9), "aggregate.p90").ok()?,
        p99: narrow_ms(quantile(&sorted, 0.99), "aggregate.p99").ok()?,
        max: narrow_ms(max, "aggregate.max").ok()?,
    })
}

/// Linear interpolation between the two ranks around `q * (n - 1)`.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let Some(&first) = sorted.first() else {
        return 0.0;
    };
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let index = position as usize;
    let below = sorted.get(index).copied().unwrap_or(first);
    match sorted.get(index + 1) {
        Some(&above) => below + (above - below) * (position - index as f64),
        None => below,
    }
}

fn saturating_count(count: usize) -> u32 {
    count.min(u32::MAX as usize) as u32
}

/// Narrowing that overflows f32 surfaces as infinity, so one finiteness check covers both.
fn narrow_ms(value: f64, field: &str) -> Result<f32, DurationError> {
    let narrowed = value as f32;
    if narrowed.is_finite() {
        Ok(narrowed)
    } else {
        Err(DurationError::invalid_input(format!(
            "{field} is not representable in milliseconds: {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phones(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    fn outcome(durations: Vec<f64>, fallback: Option<&str>) -> DurationOutcome {
        DurationOutcome {
            durations,
            fallback: fallback.map(str::to_string),
        }
    }

    #[test]
    fn utterance_report_records_timeline_and_sum_error() {
        let report = compute_utterance_report(
            "utt-1",
            &phones(&["HH", "AY"]),
            &outcome(vec![0.25, 0.7505], None),
            1.0,
        )
        .expect("report");
        assert_eq!(report.duration_ms, 1000);
        assert_eq!(report.phoneme_count, 2);
        assert!(!report.used_fallback);
        assert!((report.sum_error_ms - 0.5).abs() < 1e-3);
        assert_eq!(report.min_phoneme_ms, Some(250.0));
        assert!((report.timings[1].start_s - 0.25).abs() < 1e-12);
        assert!(report.notes.is_empty());
    }

    #[test]
    fn fallback_and_mismatch_are_noted() {
        let report = compute_utterance_report(
            "utt-2",
            &phones(&["AH", "B", "K"]),
            &outcome(vec![0.5, 0.5], Some("decode failed")),
            1.2,
        )
        .expect("report");
        assert!(report.used_fallback);
        assert_eq!(report.fallback_reason.as_deref(), Some("decode failed"));
        assert!(report.notes.iter().any(|n| n.starts_with("length_mismatch")));
        assert!(report.notes.contains(&"sum_mismatch".to_string()));
    }

    #[test]
    fn aggregates_count_fallbacks_and_phonemes() {
        let reports = vec![
            compute_utterance_report("a", &phones(&["AH"]), &outcome(vec![1.0], None), 1.0)
                .unwrap(),
            compute_utterance_report(
                "b",
                &phones(&["K", "AE", "T"]),
                &outcome(vec![0.2, 0.2, 0.2], Some("decode failed")),
                0.6,
            )
            .unwrap(),
        ];
        let aggregates = aggregate_reports(&reports);
        assert_eq!(aggregates.counts.utterances, 2);
        assert_eq!(aggregates.counts.phonemes, 4);
        assert_eq!(aggregates.counts.fallbacks, 1);
        assert_eq!(aggregates.counts.sum_mismatches, 0);
        assert!((aggregates.mean_phoneme_duration_ms.unwrap() - 400.0).abs() < 1e-3);
        assert_eq!(aggregates.worst_abs_sum_error_ms.len(), 2);
    }

    #[test]
    fn empty_input_has_no_distributions() {
        let aggregates = aggregate_reports(&[]);
        assert_eq!(aggregates.counts.utterances, 0);
        assert!(aggregates.phoneme_duration_ms.is_none());
        assert!(aggregates.mean_phoneme_duration_ms.is_none());
    }

    #[test]
    fn quantile_interpolates_between_ranks() {
        let sorted = [0.0, 10.0, 20.0];
        assert!((quantile(&sorted, 0.5) - 10.0).abs() < 1e-12);
        assert!((quantile(&sorted, 0.25) - 5.0).abs() < 1e-12);
        assert_eq!(quantile(&sorted, 1.0), 20.0);
        assert_eq!(quantile(&[3.0], 0.9), 3.0);
        assert_eq!(quantile(&[], 0.5), 0.0);
    }

    #[test]
    fn unrepresentable_metrics_are_rejected() {
        assert!(narrow_ms(f64::NAN, "x").is_err());
        assert!(narrow_ms(1e300, "x").is_err());
        assert_eq!(narrow_ms(12.5, "x").ok(), Some(12.5));
    }
}
