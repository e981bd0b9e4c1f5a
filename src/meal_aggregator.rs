use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::food_data::{normalize_name, FoodData, NutrientVector};
use crate::nutrient_resolver::{resolve, Resolution};

/// Summed grams per ingredient, keyed by lower-cased name.
pub type RawTotals = BTreeMap<String, f64>;

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Absolute nutrient totals over every resolved ingredient.
    pub nutrients: NutrientVector,
    /// Grams per ingredient, found in the reference data or not.
    pub raw_totals: RawTotals,
    /// Lower-cased names with no reference record; they contribute no nutrients.
    pub not_found: BTreeSet<String>,
}

impl Aggregate {
    pub fn total_grams(&self) -> f64 {
        self.raw_totals.values().sum()
    }
}

/// Sums nutrients and raw grams over `(ingredient name, total grams)` pairs.
///
/// Pairs are expected to be already multiplied by serving counts. The result
/// does not depend on pair order beyond floating-point summation order.
pub fn aggregate<I, S>(data: &FoodData, pairs: I) -> Aggregate
where
    I: IntoIterator<Item = (S, f64)>,
    S: AsRef<str>,
{
    let mut result = Aggregate::default();

    for (name, grams) in pairs {
        let name = name.as_ref();
        let key = normalize_name(name);
        *result.raw_totals.entry(key.clone()).or_insert(0.0) += grams;

        match resolve(data, name, Some(grams)) {
            Resolution::Scaled(vector) => result.nutrients.accumulate_all(&vector),
            Resolution::NotFound => {
                debug!(ingredient = %name, "ingredient not in food data");
                result.not_found.insert(key);
            }
            Resolution::Unscaled(_) => {}
        }
    }

    result
}
