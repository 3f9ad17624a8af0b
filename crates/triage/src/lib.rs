//! # HealthDesk Triage
//!
//! Pure functions that turn a height and weight into a Body Mass Index, a BMI category and a
//! one-line piece of advice for the dashboard.
//!
//! Nothing here holds state. BMI is never stored on a record; callers recompute it from the
//! current measurements every time it is shown, so it cannot drift from them.
//!
//! ## Categories
//!
//! The categories use half-open intervals:
//!
//! | BMI            | Status      |
//! |----------------|-------------|
//! | `< 18.5`       | Underweight |
//! | `[18.5, 25)`   | Normal      |
//! | `[25, 30)`     | Overweight  |
//! | `>= 30`        | Obese       |
//!
//! 25.0 itself is Overweight. Status is derived from the BMI *after* rounding to two decimal
//! places, so the value shown and the category shown always agree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound (exclusive) of the Underweight band.
pub const UNDERWEIGHT_BELOW: f64 = 18.5;

/// Upper bound (exclusive) of the Normal band.
pub const NORMAL_BELOW: f64 = 25.0;

/// Upper bound (exclusive) of the Overweight band.
pub const OVERWEIGHT_BELOW: f64 = 30.0;

/// Errors raised by the BMI calculation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TriageError {
    #[error("height must be a positive number of centimetres, got {0}")]
    InvalidHeight(f64),
    #[error("weight must be a positive number of kilograms, got {0}")]
    InvalidWeight(f64),
    #[error("height {height_cm} cm and weight {weight_kg} kg give no finite BMI")]
    OutOfRange { height_cm: f64, weight_kg: f64 },
}

/// BMI category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BmiStatus {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiStatus {
    /// Classifies a BMI value.
    ///
    /// Expects a finite value as produced by [`bmi`].
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < UNDERWEIGHT_BELOW {
            BmiStatus::Underweight
        } else if bmi < NORMAL_BELOW {
            BmiStatus::Normal
        } else if bmi < OVERWEIGHT_BELOW {
            BmiStatus::Overweight
        } else {
            BmiStatus::Obese
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BmiStatus::Underweight => "Underweight",
            BmiStatus::Normal => "Normal",
            BmiStatus::Overweight => "Overweight",
            BmiStatus::Obese => "Obese",
        }
    }
}

impl fmt::Display for BmiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes BMI as `weight_kg / (height_cm / 100)^2`, rounded to two decimal places.
///
/// # Errors
///
/// Returns [`TriageError::InvalidHeight`] or [`TriageError::InvalidWeight`] when a measurement
/// is zero, negative, NaN or infinite, and [`TriageError::OutOfRange`] when the pair is valid
/// on its own but the BMI is not a finite number.
pub fn bmi(height_cm: f64, weight_kg: f64) -> Result<f64, TriageError> {
    if !height_cm.is_finite() || height_cm <= 0.0 {
        return Err(TriageError::InvalidHeight(height_cm));
    }
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(TriageError::InvalidWeight(weight_kg));
    }

    let height_m = height_cm / 100.0;
    let rounded = round_2dp(weight_kg / (height_m * height_m));
    if !rounded.is_finite() {
        return Err(TriageError::OutOfRange {
            height_cm,
            weight_kg,
        });
    }
    Ok(rounded)
}

/// Canned advice shown next to each BMI category.
pub fn advice(status: BmiStatus) -> &'static str {
    match status {
        BmiStatus::Underweight => {
            "Your BMI is below the healthy range; consider a nutrient-rich diet and talk to a clinician about healthy weight gain."
        }
        BmiStatus::Normal => {
            "Your BMI is in the healthy range; keep up regular activity and a balanced diet."
        }
        BmiStatus::Overweight => {
            "Your BMI is above the healthy range; more daily activity and smaller portions can help bring it down."
        }
        BmiStatus::Obese => {
            "Your BMI is well above the healthy range; please book a review with a clinician to plan safe weight loss."
        }
    }
}

/// The full triage result shown on a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triage {
    pub bmi: f64,
    pub status: BmiStatus,
    pub advice: String,
}

/// Runs BMI, classification and advice lookup in one step.
///
/// # Errors
///
/// Propagates the measurement errors of [`bmi`].
pub fn assess(height_cm: f64, weight_kg: f64) -> Result<Triage, TriageError> {
    let bmi = bmi(height_cm, weight_kg)?;
    let status = BmiStatus::from_bmi(bmi);
    Ok(Triage {
        bmi,
        status,
        advice: advice(status).to_owned(),
    })
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmi_for_reference_adult() {
        assert_eq!(bmi(170.0, 70.0).unwrap(), 24.22);
    }

    #[test]
    fn bmi_rounds_to_two_places() {
        // 80 / 1.8^2 = 24.691358...
        assert_eq!(bmi(180.0, 80.0).unwrap(), 24.69);
        // 50 / 1.6^2 = 19.53125
        assert_eq!(bmi(160.0, 50.0).unwrap(), 19.53);
    }

    #[test]
    fn bmi_rejects_non_positive_height() {
        assert_eq!(bmi(0.0, 70.0), Err(TriageError::InvalidHeight(0.0)));
        assert_eq!(bmi(-170.0, 70.0), Err(TriageError::InvalidHeight(-170.0)));
        assert!(matches!(bmi(f64::NAN, 70.0), Err(TriageError::InvalidHeight(_))));
    }

    #[test]
    fn bmi_rejects_non_positive_weight() {
        assert_eq!(bmi(170.0, 0.0), Err(TriageError::InvalidWeight(0.0)));
        assert!(matches!(
            bmi(170.0, f64::INFINITY),
            Err(TriageError::InvalidWeight(_))
        ));
    }

    #[test]
    fn bmi_rejects_pairs_without_a_finite_result() {
        assert!(matches!(
            bmi(1e-200, 70.0),
            Err(TriageError::OutOfRange { .. })
        ));
        assert!(matches!(
            bmi(100.0, 1e307),
            Err(TriageError::OutOfRange { .. })
        ));
        assert!(assess(1e-200, 70.0).is_err());
    }

    #[test]
    fn status_partitions_are_half_open() {
        let cases = [
            (10.0, BmiStatus::Underweight),
            (18.49, BmiStatus::Underweight),
            (18.5, BmiStatus::Normal),
            (24.9, BmiStatus::Normal),
            (24.99, BmiStatus::Normal),
            (25.0, BmiStatus::Overweight),
            (29.99, BmiStatus::Overweight),
            (30.0, BmiStatus::Obese),
            (55.3, BmiStatus::Obese),
        ];
        for (value, expected) in cases {
            assert_eq!(BmiStatus::from_bmi(value), expected, "bmi {value}");
        }
    }

    #[test]
    fn status_sweep_matches_thresholds() {
        let mut value = 5.0;
        while value < 60.0 {
            let status = BmiStatus::from_bmi(value);
            let expected = if value < 18.5 {
                BmiStatus::Underweight
            } else if value < 25.0 {
                BmiStatus::Normal
            } else if value < 30.0 {
                BmiStatus::Overweight
            } else {
                BmiStatus::Obese
            };
            assert_eq!(status, expected, "bmi {value}");
            value += 0.01;
        }
    }

    #[test]
    fn every_status_has_distinct_advice() {
        let all = [
            BmiStatus::Underweight,
            BmiStatus::Normal,
            BmiStatus::Overweight,
            BmiStatus::Obese,
        ];
        for (i, a) in all.iter().enumerate() {
            assert!(!advice(*a).is_empty());
            for b in &all[i + 1..] {
                assert_ne!(advice(*a), advice(*b));
            }
        }
    }

    #[test]
    fn assess_combines_bmi_status_and_advice() {
        let triage = assess(170.0, 70.0).unwrap();
        assert_eq!(triage.bmi, 24.22);
        assert_eq!(triage.status, BmiStatus::Normal);
        assert_eq!(triage.advice, advice(BmiStatus::Normal));
    }

    #[test]
    fn status_serialises_as_variant_name() {
        let json = serde_json::to_string(&BmiStatus::Overweight).unwrap();
        assert_eq!(json, "\"Overweight\"");
    }
}
