use crate::types::{StockRecord, keys};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Discrete quality bucket used to colour indicator values.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Excellent,
    Good,
    Moderate,
    Poor,
    Neutral,
}

impl Quality {
    /// Excellent and good both count as green.
    pub fn is_green(&self) -> bool {
        matches!(self, Quality::Excellent | Quality::Good)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Excellent => "excellent",
            Quality::Good => "good",
            Quality::Moderate => "moderate",
            Quality::Poor => "poor",
            Quality::Neutral => "neutral",
        }
    }
}

impl Display for Quality {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Threshold direction for a bucket ladder.
#[derive(Debug, Copy, Clone)]
enum Ladder {
    /// value >= excellent, >= good, >= moderate
    AtLeast(f64, f64, f64),
    /// value > excellent, > good, > moderate
    Above(f64, f64, f64),
    /// value <= excellent, <= good, <= moderate
    AtMost(f64, f64, f64),
    /// value < excellent, < good, < moderate
    Below(f64, f64, f64),
}

impl Ladder {
    fn bucket(self, value: f64) -> Quality {
        let (excellent, good, moderate) = match self {
            Ladder::AtLeast(e, g, m) => (value >= e, value >= g, value >= m),
            Ladder::Above(e, g, m) => (value > e, value > g, value > m),
            Ladder::AtMost(e, g, m) => (value <= e, value <= g, value <= m),
            Ladder::Below(e, g, m) => (value < e, value < g, value < m),
        };

        if excellent {
            Quality::Excellent
        } else if good {
            Quality::Good
        } else if moderate {
            Quality::Moderate
        } else {
            Quality::Poor
        }
    }
}

/// Bucket ladder for a classifier name, accepting both the short UI names and the backend
/// indicator keys (case-insensitive).
fn ladder(name: &str) -> Option<Ladder> {
    let ladder = match name.to_ascii_lowercase().as_str() {
        // Fraction in 0..=1
        "technical_score" => Ladder::AtLeast(0.80, 0.70, 0.50),
        "float_share" => Ladder::Below(10_000_000.0, 20_000_000.0, 50_000_000.0),
        "rvol" => Ladder::AtLeast(5.0, 2.5, 1.5),
        "a2v" | "atr_to_vwap" => Ladder::AtLeast(1.0, 0.5, 0.25),
        "volume_ratio" => Ladder::AtLeast(5.0, 2.5, 1.5),
        "atr_hod" | "atr_to_hod" => Ladder::AtMost(0.5, 1.0, 2.0),
        "roc" => Ladder::Above(10.0, 3.0, 0.0),
        "adx" => Ladder::Above(40.0, 25.0, 20.0),
        "vwap_slope" => Ladder::AtLeast(0.5, 0.0, -0.5),
        "zenp" => Ladder::Above(2.0, 1.0, 0.5),
        "atr_spread" => Ladder::Below(0.1, 0.2, 0.5),
        "probability" => Ladder::AtLeast(0.80, 0.65, 0.50),
        _ => return None,
    };
    Some(ladder)
}

/// Map a named indicator value onto a [`Quality`] bucket.
///
/// Missing or NaN values are always neutral. Unknown names are poor when negative and
/// neutral otherwise.
pub fn classify(name: &str, value: Option<f64>) -> Quality {
    let Some(value) = value.filter(|v| !v.is_nan()) else {
        return Quality::Neutral;
    };

    match ladder(name) {
        Some(ladder) => ladder.bucket(value),
        None if value < 0.0 => Quality::Poor,
        None => Quality::Neutral,
    }
}

/// Where a green check reads its value from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CheckSource {
    TechnicalScore,
    FloatShare,
    Indicator(&'static str),
}

impl CheckSource {
    pub fn read(&self, record: &StockRecord) -> Option<f64> {
        match self {
            CheckSource::TechnicalScore => record.technical_score(),
            CheckSource::FloatShare => record.float_share,
            CheckSource::Indicator(key) => record.indicator(key),
        }
    }
}

/// One of the fixed "green" threshold checks.
#[derive(Debug, Copy, Clone)]
pub struct GreenCheck {
    /// Short column label
    pub label: &'static str,
    /// Classifier name used for colour coding
    pub classifier: &'static str,
    pub source: CheckSource,
    pass: fn(f64) -> bool,
}

impl GreenCheck {
    /// Missing values never pass.
    pub fn passes(&self, record: &StockRecord) -> bool {
        self.source
            .read(record)
            .filter(|v| !v.is_nan())
            .is_some_and(self.pass)
    }

    pub fn quality(&self, record: &StockRecord) -> Quality {
        classify(self.classifier, self.source.read(record))
    }
}

pub const GREEN_CHECKS: [GreenCheck; 11] = [
    GreenCheck {
        label: "Score",
        classifier: "technical_score",
        source: CheckSource::TechnicalScore,
        pass: |v| v >= 0.70,
    },
    GreenCheck {
        label: "Float",
        classifier: "float_share",
        source: CheckSource::FloatShare,
        pass: |v| v < 20_000_000.0,
    },
    GreenCheck {
        label: "RVol",
        classifier: "rvol",
        source: CheckSource::Indicator(keys::RVOL),
        pass: |v| v >= 2.5,
    },
    GreenCheck {
        label: "A2V",
        classifier: "a2v",
        source: CheckSource::Indicator(keys::ATR_TO_VWAP),
        pass: |v| v >= 0.50,
    },
    GreenCheck {
        label: "VolR",
        classifier: "volume_ratio",
        source: CheckSource::Indicator(keys::VOLUME_RATIO),
        pass: |v| v >= 2.5,
    },
    GreenCheck {
        label: "A2H",
        classifier: "atr_hod",
        source: CheckSource::Indicator(keys::ATR_TO_HOD),
        pass: |v| v <= 1.0,
    },
    GreenCheck {
        label: "ROC",
        classifier: "roc",
        source: CheckSource::Indicator(keys::ROC),
        pass: |v| v > 3.0,
    },
    GreenCheck {
        label: "ADX",
        classifier: "adx",
        source: CheckSource::Indicator(keys::ADX),
        pass: |v| v > 25.0,
    },
    GreenCheck {
        label: "VSlope",
        classifier: "vwap_slope",
        source: CheckSource::Indicator(keys::VWAP_SLOPE),
        pass: |v| v >= 0.0,
    },
    GreenCheck {
        label: "ZenP",
        classifier: "zenp",
        source: CheckSource::Indicator(keys::ZENP),
        pass: |v| v > 1.0,
    },
    GreenCheck {
        label: "Spread",
        classifier: "atr_spread",
        source: CheckSource::Indicator(keys::ATR_SPREAD),
        pass: |v| v < 0.2,
    },
];

/// True if the record passes every green check.
pub fn check_all_green(record: &StockRecord) -> bool {
    GREEN_CHECKS.iter().all(|check| check.passes(record))
}

/// Number of green checks the record passes, `0..=11`.
pub fn green_indicator_count(record: &StockRecord) -> usize {
    GREEN_CHECKS
        .iter()
        .filter(|check| check.passes(record))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Indicators, Scores};

    fn all_green_record() -> StockRecord {
        StockRecord {
            float_share: Some(1_000_000.0),
            indicators: Some(Indicators::from([
                (keys::RVOL, 3.0),
                (keys::ATR_TO_VWAP, 0.6),
                (keys::VOLUME_RATIO, 3.0),
                (keys::ATR_TO_HOD, 0.5),
                (keys::ROC, 4.0),
                (keys::ADX, 30.0),
                (keys::VWAP_SLOPE, 0.1),
                (keys::ZENP, 1.2),
                (keys::ATR_SPREAD, 0.1),
            ])),
            scores: Some(Scores {
                technical_score: Some(0.75),
                ..Default::default()
            }),
            ..StockRecord::new("AAA")
        }
    }

    #[test]
    fn test_classify() {
        struct TestCase {
            name: &'static str,
            value: Option<f64>,
            expected: Quality,
        }

        let tests = vec![
            TestCase {
                // TC0: missing value is neutral
                name: "rvol",
                value: None,
                expected: Quality::Neutral,
            },
            TestCase {
                // TC1: NaN is neutral
                name: "adx",
                value: Some(f64::NAN),
                expected: Quality::Neutral,
            },
            TestCase {
                // TC2: inclusive lower bound
                name: "rvol",
                value: Some(2.5),
                expected: Quality::Good,
            },
            TestCase {
                // TC3: strict lower bound
                name: "roc",
                value: Some(3.0),
                expected: Quality::Moderate,
            },
            TestCase {
                // TC4: lower is better
                name: "atr_hod",
                value: Some(0.4),
                expected: Quality::Excellent,
            },
            TestCase {
                // TC5: float share
                name: "float_share",
                value: Some(60_000_000.0),
                expected: Quality::Poor,
            },
            TestCase {
                // TC6: backend key, any case
                name: "ATR_to_VWAP",
                value: Some(0.3),
                expected: Quality::Moderate,
            },
            TestCase {
                // TC7: unknown negative is poor
                name: "mystery",
                value: Some(-1.0),
                expected: Quality::Poor,
            },
            TestCase {
                // TC8: unknown non-negative is neutral
                name: "mystery",
                value: Some(7.0),
                expected: Quality::Neutral,
            },
            TestCase {
                // TC9: technical score as a fraction
                name: "technical_score",
                value: Some(0.82),
                expected: Quality::Excellent,
            },
            TestCase {
                // TC10: ZENP spelling classifies like ZenP
                name: "ZENP",
                value: Some(1.5),
                expected: Quality::Good,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = classify(test.name, test.value);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_all_green_record() {
        let record = all_green_record();
        assert!(check_all_green(&record));
        assert_eq!(green_indicator_count(&record), 11);
    }

    #[test]
    fn test_missing_value_fails_check() {
        let mut record = all_green_record();
        record.float_share = None;

        assert!(!check_all_green(&record));
        assert_eq!(green_indicator_count(&record), 10);

        assert_eq!(green_indicator_count(&StockRecord::new("EMPTY")), 0);
    }

    #[test]
    fn test_green_checks_agree_with_classifier() {
        let record = all_green_record();
        for check in GREEN_CHECKS.iter() {
            assert!(check.quality(&record).is_green(), "{} not green", check.label);
        }
    }
}
