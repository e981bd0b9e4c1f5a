use serde::{Deserialize, Serialize};

use crate::food_data::NutrientVector;

pub const DEFAULT_TARGET_CALORIES: f64 = 2500.0;

/// Range offered to users for the target; the normalizer itself accepts any
/// positive value.
pub const MIN_TARGET_CALORIES: f64 = 1000.0;
pub const MAX_TARGET_CALORIES: f64 = 4000.0;

/// Factor that brings `vector`'s energy to `target_calories`. 1 when the
/// vector has no positive energy.
pub fn scaling_factor(vector: &NutrientVector, target_calories: f64) -> f64 {
    let original = vector.energy();
    if original > 0.0 {
        target_calories / original
    } else {
        1.0
    }
}

/// Rescales every nutrient so that energy equals `target_calories`, keeping
/// proportions. Identity when `enabled` is false.
pub fn normalize(vector: &NutrientVector, target_calories: f64, enabled: bool) -> NutrientVector {
    if !enabled {
        return vector.clone();
    }
    vector.scaled(scaling_factor(vector, target_calories))
}

/// Clamps a user-supplied target into the offered range.
pub fn clamp_target(target_calories: f64) -> f64 {
    if target_calories.is_nan() {
        return DEFAULT_TARGET_CALORIES;
    }
    target_calories.clamp(MIN_TARGET_CALORIES, MAX_TARGET_CALORIES)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationSettings {
    pub enabled: bool,
    pub target_calories: f64,
}

impl Default for NormalizationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_calories: DEFAULT_TARGET_CALORIES,
        }
    }
}

impl NormalizationSettings {
    pub fn apply(&self, vector: &NutrientVector) -> NutrientVector {
        normalize(vector, self.target_calories, self.enabled)
    }
}
