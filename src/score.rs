//! Confidence arithmetic.
//!
//! Every confidence in the system is a value in [0,1]. Scores start from a
//! base determined by the kind of evidence and are raised, never averaged
//! down, by corroborating evidence.

/// Base confidence per language evidence tier.
pub mod tiers {
    /// Explicit code-block language tag.
    pub const CODE_TAG: f64 = 0.9;
    /// File name or extension mentioned in prose next to a code block.
    pub const FILE_REFERENCE: f64 = 0.75;
    /// Free-text language name.
    pub const TEXT_MENTION: f64 = 0.5;
}

/// Base confidence per command pattern, in priority order.
pub mod patterns {
    pub const PACKAGE_MANAGER: f64 = 0.95;
    pub const EXECUTABLE: f64 = 0.8;
    pub const SCRIPT: f64 = 0.75;
    pub const BARE_WORD: f64 = 0.6;
    /// Multiplier for commands found in inline code rather than code blocks.
    pub const INLINE_FACTOR: f64 = 0.8;
}

/// Corroboration boost.
pub mod boost {
    /// Added per corroborating piece of evidence.
    pub const PER_EVIDENCE: f64 = 0.025;
    /// Corroborating evidence beyond this count adds nothing.
    pub const MAX_EVIDENCE: usize = 4;
    /// Added per additional successful result in a category.
    pub const PER_RESULT: f64 = 0.05;
}

/// Grade thresholds (lower bounds).
pub mod grades {
    pub const A_MIN: f64 = 0.85;
    pub const B_MIN: f64 = 0.7;
    pub const C_MIN: f64 = 0.5;
    pub const D_MIN: f64 = 0.3;
}

/// Clamp into [0,1]. NaN becomes 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Base score raised by corroborating evidence, capped at 1.0.
pub fn boosted(base: f64, corroborating: usize) -> f64 {
    let extra = corroborating.min(boost::MAX_EVIDENCE) as f64 * boost::PER_EVIDENCE;
    clamp_unit(base + extra)
}

/// Weighted mean of `(value, weight)` pairs. Empty or zero-weight input is 0.
pub fn weighted_mean(values: &[(f64, f64)]) -> f64 {
    let total: f64 = values.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|(v, w)| clamp_unit(*v) * w.max(0.0)).sum();
    clamp_unit(sum / total)
}

/// Confidence of a set of findings produced by one analyzer: their mean,
/// raised by how many findings agree.
pub fn combine(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().copied().map(clamp_unit).sum::<f64>() / values.len() as f64;
    boosted(mean, values.len() - 1)
}

/// Per-category confidence from `(result confidence, evidence sources)` of
/// every successful result in the category.
///
/// Each result is weighted by `1 + sources`; every additional result raises
/// the mean instead of diluting it.
pub fn category_confidence(results: &[(f64, usize)]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let weighted: Vec<(f64, f64)> = results
        .iter()
        .map(|(c, sources)| (*c, 1.0 + *sources as f64))
        .collect();
    let mean = weighted_mean(&weighted);
    if mean == 0.0 {
        return 0.0;
    }
    clamp_unit(mean + (results.len() - 1) as f64 * boost::PER_RESULT)
}

/// Letter grade for a confidence.
pub fn calculate_grade(confidence: f64) -> &'static str {
    match confidence {
        c if c >= grades::A_MIN => "A",
        c if c >= grades::B_MIN => "B",
        c if c >= grades::C_MIN => "C",
        c if c >= grades::D_MIN => "D",
        _ => "F",
    }
}

/// Round to four decimals so serialised output stays stable.
pub fn round(value: f64) -> f64 {
    (clamp_unit(value) * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boost_is_capped() {
        assert_eq!(boosted(tiers::CODE_TAG, 0), 0.9);
        assert!((boosted(tiers::CODE_TAG, 2) - 0.95).abs() < 1e-9);
        assert_eq!(boosted(tiers::CODE_TAG, 100), 1.0);
        assert!(boosted(0.99, 4) <= 1.0);
    }

    #[test]
    fn test_weighted_mean() {
        assert_eq!(weighted_mean(&[]), 0.0);
        assert_eq!(weighted_mean(&[(0.5, 0.0)]), 0.0);
        let mean = weighted_mean(&[(1.0, 3.0), (0.0, 1.0)]);
        assert!((mean - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_category_confidence_rises_with_results() {
        let single = category_confidence(&[(0.6, 2)]);
        let double = category_confidence(&[(0.6, 2), (0.6, 2)]);
        assert!(double > single);
        assert_eq!(category_confidence(&[]), 0.0);
        assert!(category_confidence(&[(1.0, 10), (1.0, 10), (1.0, 1)]) <= 1.0);
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(calculate_grade(1.0), "A");
        assert_eq!(calculate_grade(0.85), "A");
        assert_eq!(calculate_grade(0.7), "B");
        assert_eq!(calculate_grade(0.5), "C");
        assert_eq!(calculate_grade(0.3), "D");
        assert_eq!(calculate_grade(0.0), "F");
    }

    #[test]
    fn test_clamp_handles_nan() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(-1.0), 0.0);
        assert_eq!(round(0.123456), 0.1235);
    }
}
