//! Status bands for a resolved value against its catalog target.

use super::domain::{KpiOperator, KpiStatus, KpiTarget};
use tracing::warn;

/// Tolerance above an upper bound that still counts as a warning.
const AT_MOST_WARNING_FACTOR: f64 = 1.15;
/// Tolerance below a lower bound that still counts as a warning.
const AT_LEAST_WARNING_FACTOR: f64 = 0.85;
/// Relative distance from an exact target that still counts as a warning.
const EQUAL_WARNING_TOLERANCE: f64 = 0.10;
const RANGE_LOW_WARNING_FACTOR: f64 = 0.8;
const RANGE_HIGH_WARNING_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    #[error("range target '{0}' is not of the form 'min-max'")]
    Malformed(String),
    #[error("range target '{0}' has min greater than max")]
    Inverted(String),
    #[error("range operator needs a 'min-max' target, got {0}")]
    NotARange(f64),
}

/// Inclusive `[min, max]` band parsed from a `"min-max"` target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRange {
    pub min: f64,
    pub max: f64,
}

impl TargetRange {
    pub fn parse(raw: &str) -> Result<Self, RangeError> {
        let trimmed = raw.trim();
        // skip the first char so a leading minus sign is not taken as the separator
        let split = trimmed
            .char_indices()
            .skip(1)
            .find(|(_, ch)| *ch == '-')
            .map(|(index, _)| index)
            .ok_or_else(|| RangeError::Malformed(raw.to_string()))?;

        let bound = |text: &str| {
            text.trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| RangeError::Malformed(raw.to_string()))
        };
        let min = bound(&trimmed[..split])?;
        let max = bound(&trimmed[split + 1..])?;

        if min > max {
            return Err(RangeError::Inverted(raw.to_string()));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Classifies `value` against `target` under `operator`.
///
/// Informational KPIs are always `Info`, a missing value is `NoData`, and a
/// scored KPI without a target is reported as `Info`. A range target that
/// cannot be parsed is logged and yields `NoData` so one bad definition never
/// aborts a scorecard.
pub fn classify(value: Option<f64>, target: Option<&KpiTarget>, operator: KpiOperator) -> KpiStatus {
    if operator == KpiOperator::Info {
        return KpiStatus::Info;
    }
    let Some(value) = value.filter(|value| value.is_finite()) else {
        return KpiStatus::NoData;
    };
    let Some(target) = target else {
        return KpiStatus::Info;
    };

    match (operator, target) {
        (KpiOperator::Range, KpiTarget::Range(raw)) => match TargetRange::parse(raw) {
            Ok(range) => classify_range(value, range),
            Err(err) => {
                warn!(error = %err, "unusable range target; reporting no data");
                KpiStatus::NoData
            }
        },
        (KpiOperator::Range, KpiTarget::Number(number)) => {
            warn!(error = %RangeError::NotARange(*number), "unusable range target; reporting no data");
            KpiStatus::NoData
        }
        (_, KpiTarget::Number(threshold)) => classify_threshold(value, *threshold, operator),
        (_, KpiTarget::Range(raw)) => match raw.trim().parse::<f64>() {
            Ok(threshold) if threshold.is_finite() => classify_threshold(value, threshold, operator),
            _ => {
                warn!(target_value = %raw, %operator, "non-numeric target for comparison operator");
                KpiStatus::NoData
            }
        },
    }
}

fn classify_threshold(value: f64, threshold: f64, operator: KpiOperator) -> KpiStatus {
    match operator {
        KpiOperator::AtMost => {
            if value <= threshold {
                KpiStatus::OnTarget
            } else if value <= threshold * AT_MOST_WARNING_FACTOR {
                KpiStatus::Warning
            } else {
                KpiStatus::Critical
            }
        }
        KpiOperator::AtLeast => {
            if value >= threshold {
                KpiStatus::OnTarget
            } else if value >= threshold * AT_LEAST_WARNING_FACTOR {
                KpiStatus::Warning
            } else {
                KpiStatus::Critical
            }
        }
        KpiOperator::Equal => {
            if value == threshold {
                KpiStatus::OnTarget
            } else if (value - threshold).abs() <= threshold.abs() * EQUAL_WARNING_TOLERANCE {
                KpiStatus::Warning
            } else {
                KpiStatus::Critical
            }
        }
        KpiOperator::Range | KpiOperator::Info => KpiStatus::Info,
    }
}

fn classify_range(value: f64, range: TargetRange) -> KpiStatus {
    if range.contains(value) {
        KpiStatus::OnTarget
    } else if value >= range.min * RANGE_LOW_WARNING_FACTOR
        && value <= range.max * RANGE_HIGH_WARNING_FACTOR
    {
        KpiStatus::Warning
    } else {
        KpiStatus::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(value: f64) -> KpiTarget {
        KpiTarget::Number(value)
    }

    #[test]
    fn info_operator_wins_over_missing_value() {
        assert_eq!(classify(None, None, KpiOperator::Info), KpiStatus::Info);
        assert_eq!(
            classify(Some(12.0), Some(&number(5.0)), KpiOperator::Info),
            KpiStatus::Info
        );
    }

    #[test]
    fn missing_or_non_finite_value_is_no_data() {
        let target = number(15.0);
        assert_eq!(classify(None, Some(&target), KpiOperator::AtMost), KpiStatus::NoData);
        assert_eq!(
            classify(Some(f64::NAN), Some(&target), KpiOperator::AtMost),
            KpiStatus::NoData
        );
    }

    #[test]
    fn scored_kpi_without_target_is_info() {
        assert_eq!(classify(Some(3.0), None, KpiOperator::AtLeast), KpiStatus::Info);
    }

    #[test]
    fn at_most_bands() {
        let t = 15.0;
        let target = number(t);
        let status = |value| classify(Some(value), Some(&target), KpiOperator::AtMost);
        assert_eq!(status(t), KpiStatus::OnTarget);
        assert_eq!(status(t * 1.15), KpiStatus::Warning);
        assert_eq!(status(t * 1.2), KpiStatus::Critical);
        assert_eq!(status(16.0), KpiStatus::Warning);
    }

    #[test]
    fn at_least_bands() {
        let target = number(90.0);
        let status = |value| classify(Some(value), Some(&target), KpiOperator::AtLeast);
        assert_eq!(status(95.0), KpiStatus::OnTarget);
        assert_eq!(status(80.0), KpiStatus::Warning);
        assert_eq!(status(70.0), KpiStatus::Critical);
    }

    #[test]
    fn equal_bands_and_zero_target() {
        let hundred = number(100.0);
        assert_eq!(
            classify(Some(100.0), Some(&hundred), KpiOperator::Equal),
            KpiStatus::OnTarget
        );
        assert_eq!(
            classify(Some(92.0), Some(&hundred), KpiOperator::Equal),
            KpiStatus::Warning
        );
        assert_eq!(
            classify(Some(85.0), Some(&hundred), KpiOperator::Equal),
            KpiStatus::Critical
        );

        let zero = number(0.0);
        assert_eq!(classify(Some(0.0), Some(&zero), KpiOperator::Equal), KpiStatus::OnTarget);
        assert_eq!(classify(Some(1.0), Some(&zero), KpiOperator::Equal), KpiStatus::Critical);
    }

    #[test]
    fn range_bands() {
        let target = KpiTarget::range("3-5");
        let status = |value| classify(Some(value), Some(&target), KpiOperator::Range);
        assert_eq!(status(4.0), KpiStatus::OnTarget);
        assert_eq!(status(3.0), KpiStatus::OnTarget);
        assert_eq!(status(6.0), KpiStatus::Warning);
        assert_eq!(status(2.5), KpiStatus::Warning);
        assert_eq!(status(8.0), KpiStatus::Critical);
        assert_eq!(status(1.0), KpiStatus::Critical);
    }

    #[test]
    fn malformed_range_is_no_data() {
        for raw in ["3to5", "5-3", "-", "a-b", ""] {
            let target = KpiTarget::range(raw);
            assert_eq!(
                classify(Some(4.0), Some(&target), KpiOperator::Range),
                KpiStatus::NoData,
                "range '{raw}'"
            );
        }
        assert_eq!(
            classify(Some(4.0), Some(&number(4.0)), KpiOperator::Range),
            KpiStatus::NoData
        );
    }

    #[test]
    fn range_parsing_allows_negative_lower_bound() {
        let range = TargetRange::parse("-2-2").expect("negative lower bound parses");
        assert_eq!(range, TargetRange { min: -2.0, max: 2.0 });
    }

    #[test]
    fn classification_is_total_for_scored_operators() {
        let values = [0.0, -1.0, -1e12, 1e12, f64::MAX, 0.5];
        let targets = [number(0.0), number(-10.0), number(15.0), KpiTarget::range("15-25")];
        let operators = [
            KpiOperator::AtMost,
            KpiOperator::AtLeast,
            KpiOperator::Equal,
            KpiOperator::Range,
        ];
        for value in values {
            for target in &targets {
                for operator in operators {
                    let status = classify(Some(value), Some(target), operator);
                    assert_ne!(status, KpiStatus::Info, "{value} {target} {operator}");
                }
            }
        }
    }
}
