use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// Name of the nutrient that carries the energy (kcal) total.
pub const ENERGY: &str = "Energy";

/// Category reported for foods without one.
pub const DEFAULT_CATEGORY: &str = "Other";

/// One nutrient's amount together with its display metadata.
///
/// In a [`FoodRecord`] the amount is per 100 g of food; in resolved and
/// aggregated vectors it is the absolute amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientAmount {
    pub amount: f64,
    pub unit_name: String,
    pub category: String,
    /// Daily reference value, in `unit_name`.
    pub drv: Option<f64>,
}

impl NutrientAmount {
    fn with_amount(&self, amount: f64) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }
}

/// Nutrient name -> amount. Iterates in nutrient-name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutrientVector(BTreeMap<String, NutrientAmount>);

impl NutrientVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, nutrient: &str) -> Option<&NutrientAmount> {
        self.0.get(nutrient)
    }

    pub fn amount(&self, nutrient: &str) -> Option<f64> {
        self.0.get(nutrient).map(|n| n.amount)
    }

    /// Energy amount, or 0 when the vector has no energy entry.
    pub fn energy(&self) -> f64 {
        self.amount(ENERGY).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, NutrientAmount> {
        self.0.iter()
    }

    pub fn insert(&mut self, nutrient: impl Into<String>, value: NutrientAmount) {
        self.0.insert(nutrient.into(), value);
    }

    /// New vector with every amount multiplied by `factor`; units, categories
    /// and DRVs are carried over untouched.
    pub fn scaled(&self, factor: f64) -> Self {
        Self(
            self.0
                .iter()
                .map(|(name, n)| (name.clone(), n.with_amount(n.amount * factor)))
                .collect(),
        )
    }

    /// Adds `value.amount` into the entry for `nutrient`. The first value seen
    /// for a nutrient seeds its metadata; later ones only contribute amount.
    pub fn accumulate(&mut self, nutrient: &str, value: &NutrientAmount) {
        match self.0.get_mut(nutrient) {
            Some(existing) => existing.amount += value.amount,
            None => {
                self.0.insert(nutrient.to_string(), value.clone());
            }
        }
    }

    /// Accumulates every entry of `other` into `self`.
    pub fn accumulate_all(&mut self, other: &NutrientVector) {
        for (name, value) in other.iter() {
            self.accumulate(name, value);
        }
    }
}

impl FromIterator<(String, NutrientAmount)> for NutrientVector {
    fn from_iter<T: IntoIterator<Item = (String, NutrientAmount)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a NutrientVector {
    type Item = (&'a String, &'a NutrientAmount);
    type IntoIter = btree_map::Iter<'a, String, NutrientAmount>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Named household portion, e.g. "cup" = 240 g.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portion {
    pub unit_name: String,
    pub gram_weight: f64,
}

impl Portion {
    /// Returns a portion only when the unit is named and the weight is a
    /// finite positive number.
    pub fn new(unit_name: Option<String>, gram_weight: Option<f64>) -> Option<Self> {
        let unit_name = unit_name.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())?;
        let gram_weight = gram_weight.filter(|w| w.is_finite() && *w > 0.0)?;
        Some(Self {
            unit_name,
            gram_weight,
        })
    }

    /// Number of portions in `grams`, rounded to the nearest quarter.
    pub fn count_for(&self, grams: f64) -> f64 {
        ((grams / self.gram_weight) * 4.0).round() / 4.0
    }

    /// e.g. "1.50 cups", "0.25 cup".
    pub fn describe(&self, grams: f64) -> String {
        let count = self.count_for(grams);
        if count <= 1.0 {
            format!("{:.2} {}", count, self.unit_name)
        } else {
            format!("{:.2} {}s", count, self.unit_name)
        }
    }
}

/// One entry of the food reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub name: String,
    pub category: String,
    pub portion: Option<Portion>,
    /// Amounts per 100 g.
    pub nutrients: NutrientVector,
}

impl FoodRecord {
    pub fn new(name: impl Into<String>, category: Option<String>) -> Self {
        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        Self {
            name: name.into().trim().to_string(),
            category,
            portion: None,
            nutrients: NutrientVector::new(),
        }
    }

    pub fn with_portion(mut self, portion: Option<Portion>) -> Self {
        self.portion = portion;
        self
    }

    pub fn with_nutrient(mut self, nutrient: impl Into<String>, value: NutrientAmount) -> Self {
        self.nutrients.insert(nutrient, value);
        self
    }
}
