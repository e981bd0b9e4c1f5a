use crate::food_data::{FoodData, NutrientVector};

/// Outcome of resolving an ingredient against the food reference data.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Absolute amounts for the requested quantity.
    Scaled(NutrientVector),
    /// No quantity was given: the record's per-100 g amounts, unscaled. Not
    /// a final amount; aggregation never adds these.
    Unscaled(NutrientVector),
    /// No food with this name.
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        !matches!(self, Resolution::NotFound)
    }

    /// The scaled vector, if this resolution has one.
    pub fn scaled(&self) -> Option<&NutrientVector> {
        match self {
            Resolution::Scaled(vector) => Some(vector),
            _ => None,
        }
    }
}

/// Resolves `ingredient_name` (case-insensitive) and scales its per-100 g
/// nutrients by `quantity_grams / 100`.
pub fn resolve(data: &FoodData, ingredient_name: &str, quantity_grams: Option<f64>) -> Resolution {
    let Some(per_100g) = data.nutrients(ingredient_name) else {
        return Resolution::NotFound;
    };
    match quantity_grams {
        Some(grams) => Resolution::Scaled(per_100g.scaled(grams / 100.0)),
        None => Resolution::Unscaled(per_100g.clone()),
    }
}
