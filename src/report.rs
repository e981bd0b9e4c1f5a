//! Display-ready values: ingredient shopping lists and nutrient breakdowns
//! grouped by category, with DRV percentages and household portions.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::food_data::{FoodData, NutrientVector, DEFAULT_CATEGORY};
use crate::meal_aggregator::RawTotals;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientLine {
    pub name: String,
    pub grams: f64,
    /// e.g. "1.50 cups" when the food has a named portion.
    pub portion: Option<String>,
    pub recognised: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientLine {
    pub name: String,
    pub amount: f64,
    pub unit_name: String,
    pub drv: Option<f64>,
    /// Share of the daily reference value, capped at 100. `None` without a
    /// positive DRV.
    pub drv_percent: Option<f64>,
}

pub fn drv_percent(amount: f64, drv: Option<f64>) -> Option<f64> {
    drv.filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| (amount / d * 100.0).min(100.0))
}

/// Ingredient totals grouped by food category; categories and names sorted.
pub fn group_ingredients_by_category(
    data: &FoodData,
    raw_totals: &RawTotals,
) -> BTreeMap<String, Vec<IngredientLine>> {
    let mut groups: BTreeMap<String, Vec<IngredientLine>> = BTreeMap::new();
    for (name, &grams) in raw_totals {
        let record = data.get(name);
        let line = IngredientLine {
            name: record.map(|r| r.name.clone()).unwrap_or_else(|| name.clone()),
            grams,
            portion: record
                .and_then(|r| r.portion.as_ref())
                .map(|p| p.describe(grams)),
            recognised: record.is_some(),
        };
        let category = record
            .map(|r| r.category.clone())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        groups.entry(category).or_default().push(line);
    }
    groups
}

/// Nutrients grouped by nutrient category (blank categories become "Other").
pub fn group_nutrients_by_category(vector: &NutrientVector) -> BTreeMap<String, Vec<NutrientLine>> {
    let mut groups: BTreeMap<String, Vec<NutrientLine>> = BTreeMap::new();
    for (name, nutrient) in vector {
        let category = if nutrient.category.trim().is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            nutrient.category.clone()
        };
        groups.entry(category).or_default().push(NutrientLine {
            name: name.clone(),
            amount: nutrient.amount,
            unit_name: nutrient.unit_name.clone(),
            drv: nutrient.drv,
            drv_percent: drv_percent(nutrient.amount, nutrient.drv),
        });
    }
    groups
}

/// Plain-text rendering of both groupings.
pub fn write_report(
    out: &mut impl Write,
    heading: &str,
    ingredients: &BTreeMap<String, Vec<IngredientLine>>,
    nutrients: &BTreeMap<String, Vec<NutrientLine>>,
) -> io::Result<()> {
    writeln!(out, "Ingredients to buy")?;
    for (category, lines) in ingredients {
        writeln!(out, "  {}", category)?;
        for line in lines {
            let marker = if line.recognised { "" } else { " (not recognised)" };
            match &line.portion {
                Some(portion) => writeln!(out, "    {}: {:.0}g ({}){}", line.name, line.grams, portion, marker)?,
                None => writeln!(out, "    {}: {:.0}g{}", line.name, line.grams, marker)?,
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", heading)?;
    for (category, lines) in nutrients {
        writeln!(out, "  {}", category)?;
        for line in lines {
            let drv = line.drv.map(|d| format!("{}", d)).unwrap_or_else(|| "N/A".to_string());
            match line.drv_percent {
                Some(pct) => writeln!(
                    out,
                    "    {}: {:.2} / {} {} ({:.0}%)",
                    line.name, line.amount, drv, line.unit_name, pct
                )?,
                None => writeln!(out, "    {}: {:.2} / {} {}", line.name, line.amount, drv, line.unit_name)?,
            }
        }
    }
    Ok(())
}
