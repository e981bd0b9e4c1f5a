use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

use super::index::FoodData;
use super::record::{FoodRecord, NutrientAmount, Portion};

// Foods CSV columns. The first alias is the two-file export, the second the
// single-file export that encodes nutrient metadata into the column names.
const FOOD_NAME_COLS: &[&str] = &["foodName", "food_name"];
const FOOD_CATEGORY_COLS: &[&str] = &["food_category", "category"];
const PORTION_UNIT_COL: &str = "portion_unit_name";
const PORTION_WEIGHT_COL: &str = "portion_gram_weight";

// Nutrients CSV columns.
const NUTRIENT_NAME_COL: &str = "nutrientName";
const NUTRIENT_UNIT_COL: &str = "unit_name";
const NUTRIENT_CATEGORY_COL: &str = "nutrient_category";
const NUTRIENT_DRV_COL: &str = "drv";
const NUTRIENT_ORDER_COL: &str = "nutrient_order";

#[derive(Debug, Deserialize)]
struct RawFood {
    #[serde(default)]
    category: Value,
    #[serde(default)]
    portion_unit_name: Value,
    #[serde(default)]
    portion_gram_weight: Value,
    #[serde(default)]
    nutrients: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawNutrient {
    #[serde(default)]
    amount: Value,
    #[serde(default, alias = "unit")]
    unit_name: Value,
    #[serde(default)]
    category: Value,
    #[serde(default)]
    drv: Value,
}

#[derive(Debug, Clone)]
struct NutrientColumn {
    name: String,
    unit_name: String,
    category: String,
    drv: Option<f64>,
}

/// Parses numbers that may arrive as numbers, numeric strings, "N/A" or null.
fn parse_optional_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_optional_f64(s),
        _ => None,
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn finish(data: FoodData, origin: &str) -> Result<FoodData> {
    if data.is_empty() {
        return Err(anyhow!("No food records loaded from {}", origin));
    }
    Ok(data)
}

/// Parses the JSON reference format: an object keyed by food name.
pub fn parse_food_data_json(text: &str) -> Result<FoodData> {
    let root: Map<String, Value> =
        serde_json::from_str(text).context("Food data JSON is not an object keyed by food name")?;

    let mut data = FoodData::new();
    for (name, entry) in root {
        if name.trim().is_empty() {
            continue;
        }
        let raw: RawFood = serde_json::from_value(entry)
            .with_context(|| format!("Malformed food entry '{}'", name))?;

        let portion = Portion::new(
            value_as_string(&raw.portion_unit_name),
            value_as_f64(&raw.portion_gram_weight),
        );
        let mut record = FoodRecord::new(name, value_as_string(&raw.category)).with_portion(portion);

        for (nutrient_name, nutrient_value) in raw.nutrients {
            let nutrient: RawNutrient = serde_json::from_value(nutrient_value).with_context(|| {
                format!("Malformed nutrient '{}' of '{}'", nutrient_name, record.name)
            })?;
            let Some(amount) = value_as_f64(&nutrient.amount) else {
                debug!(food = %record.name, nutrient = %nutrient_name, "skipping nutrient without numeric amount");
                continue;
            };
            record.nutrients.insert(
                nutrient_name,
                NutrientAmount {
                    amount,
                    unit_name: value_as_string(&nutrient.unit_name).unwrap_or_default(),
                    category: value_as_string(&nutrient.category).unwrap_or_default(),
                    drv: value_as_f64(&nutrient.drv),
                },
            );
        }
        data.insert(record);
    }

    finish(data, "JSON")
}

fn column_index(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h.trim()))
}

fn required_column(headers: &StringRecord, names: &[&str]) -> Result<usize> {
    column_index(headers, names).ok_or_else(|| anyhow!("Column '{}' not found", names[0]))
}

/// Reads nutrient metadata rows, returned in `nutrient_order` when present,
/// otherwise in file order.
fn parse_nutrient_columns(nutrients_csv: &str) -> Result<Vec<NutrientColumn>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(nutrients_csv.as_bytes());
    let headers = rdr.headers()?.clone();

    let name_idx = required_column(&headers, &[NUTRIENT_NAME_COL])?;
    let unit_idx = required_column(&headers, &[NUTRIENT_UNIT_COL])?;
    let category_idx = required_column(&headers, &[NUTRIENT_CATEGORY_COL])?;
    let drv_idx = required_column(&headers, &[NUTRIENT_DRV_COL])?;
    let order_idx = column_index(&headers, &[NUTRIENT_ORDER_COL]);

    let mut columns = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read nutrient row {}", row_index))?;
        let Some(name) = record.get(name_idx).and_then(non_empty) else {
            continue;
        };
        let order = order_idx
            .and_then(|i| record.get(i))
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(row_index as i64);
        columns.push((
            order,
            NutrientColumn {
                name,
                unit_name: record.get(unit_idx).unwrap_or_default().trim().to_string(),
                category: record.get(category_idx).unwrap_or_default().trim().to_string(),
                drv: record.get(drv_idx).and_then(parse_optional_f64),
            },
        ));
    }
    columns.sort_by_key(|(order, _)| *order);
    Ok(columns.into_iter().map(|(_, c)| c).collect())
}

/// Reads `Name|category|drv|unit` headers of the single-file export.
fn parse_encoded_nutrient_column(header: &str) -> Option<NutrientColumn> {
    let parts: Vec<&str> = header.split('|').collect();
    let [name, category, drv, unit_name] = parts.as_slice() else {
        return None;
    };
    Some(NutrientColumn {
        name: non_empty(name)?,
        unit_name: unit_name.trim().to_string(),
        category: category.trim().to_string(),
        drv: parse_optional_f64(drv),
    })
}

/// Parses the CSV reference formats.
///
/// With `nutrients_csv`, nutrient columns of the foods CSV are named after the
/// nutrients listed there. Without it, nutrient columns carry their metadata
/// in the header (`Energy|Energy|2000.0|kcal`).
pub fn parse_food_data_csv(foods_csv: &str, nutrients_csv: Option<&str>) -> Result<FoodData> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(foods_csv.as_bytes());
    let headers = rdr.headers()?.clone();

    let name_idx = required_column(&headers, FOOD_NAME_COLS)?;
    let category_idx = column_index(&headers, FOOD_CATEGORY_COLS);
    let unit_idx = column_index(&headers, &[PORTION_UNIT_COL]);
    let weight_idx = column_index(&headers, &[PORTION_WEIGHT_COL]);

    let nutrient_columns: Vec<(usize, NutrientColumn)> = match nutrients_csv {
        Some(meta) => parse_nutrient_columns(meta)?
            .into_iter()
            .filter_map(|column| {
                let idx = column_index(&headers, &[column.name.as_str()]);
                if idx.is_none() {
                    debug!(nutrient = %column.name, "nutrient has no column in foods CSV");
                }
                idx.map(|i| (i, column))
            })
            .collect(),
        None => headers
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                ![Some(name_idx), category_idx, unit_idx, weight_idx].contains(&Some(*i))
            })
            .filter_map(|(i, h)| parse_encoded_nutrient_column(h).map(|c| (i, c)))
            .collect(),
    };

    let mut data = FoodData::new();
    for (row_index, result) in rdr.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read record at row index {}", row_index))?;

        let Some(name) = row.get(name_idx).and_then(non_empty) else {
            continue;
        };
        let category = category_idx.and_then(|i| row.get(i)).and_then(non_empty);
        let portion = Portion::new(
            unit_idx.and_then(|i| row.get(i)).and_then(non_empty),
            weight_idx.and_then(|i| row.get(i)).and_then(parse_optional_f64),
        );

        let mut record = FoodRecord::new(name, category).with_portion(portion);
        for (idx, column) in &nutrient_columns {
            let Some(amount) = row.get(*idx).and_then(parse_optional_f64) else {
                continue;
            };
            record.nutrients.insert(
                column.name.clone(),
                NutrientAmount {
                    amount,
                    unit_name: column.unit_name.clone(),
                    category: column.category.clone(),
                    drv: column.drv,
                },
            );
        }
        data.insert(record);
    }

    finish(data, "CSV")
}

pub async fn load_food_data_json(path: &Path) -> Result<FoodData> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read food data JSON at {:?}", path))?;
    parse_food_data_json(&text).with_context(|| format!("Invalid food data JSON at {:?}", path))
}

pub async fn load_food_data_csv(foods_path: &Path, nutrients_path: Option<&Path>) -> Result<FoodData> {
    let foods = tokio::fs::read_to_string(foods_path)
        .await
        .with_context(|| format!("Failed to read foods CSV at {:?}", foods_path))?;
    let nutrients = match nutrients_path {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read nutrients CSV at {:?}", path))?,
        ),
        None => None,
    };
    parse_food_data_csv(&foods, nutrients.as_deref())
        .with_context(|| format!("Invalid food data CSV at {:?}", foods_path))
}
