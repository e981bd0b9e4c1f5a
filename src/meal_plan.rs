//! Weekly meal plan texts and the user's serving selections.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::MealKeyError;
use crate::food_data::{normalize_name, FoodData};
use crate::ingredient_parser::{parse_ingredients, IngredientMention};
use crate::meal_aggregator::{aggregate, Aggregate};

pub const DAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];
pub const MEALS: [&str; 3] = ["morning", "midday", "evening"];
pub const VERSIONS: [u32; 3] = [1, 2, 3];

const MEAL_FILE_EXTENSIONS: [&str; 2] = ["md", "txt"];

/// Identifies one version of one meal slot on one day, e.g. `monday-morning-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MealKey {
    pub day: String,
    pub meal: String,
    pub version: u32,
}

impl MealKey {
    pub fn new(day: &str, meal: &str, version: u32) -> Result<Self, MealKeyError> {
        let day = day.trim().to_lowercase();
        let meal = meal.trim().to_lowercase();
        if !DAYS.contains(&day.as_str()) {
            return Err(MealKeyError::UnknownDay(day));
        }
        if !MEALS.contains(&meal.as_str()) {
            return Err(MealKeyError::UnknownMeal(meal));
        }
        if !VERSIONS.contains(&version) {
            return Err(MealKeyError::UnknownVersion(version));
        }
        Ok(Self { day, meal, version })
    }

    /// Every day/meal/version combination of the default plan layout.
    pub fn all() -> impl Iterator<Item = MealKey> {
        DAYS.iter().flat_map(|day| {
            MEALS.iter().flat_map(move |meal| {
                VERSIONS.iter().map(move |&version| MealKey {
                    day: day.to_string(),
                    meal: meal.to_string(),
                    version,
                })
            })
        })
    }

    /// File name without extension, e.g. `monday_morning_1`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}_{}", self.day, self.meal, self.version)
    }
}

impl fmt::Display for MealKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.day, self.meal, self.version)
    }
}

impl FromStr for MealKey {
    type Err = MealKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        let [day, meal, version] = parts.as_slice() else {
            return Err(MealKeyError::Format(s.to_string()));
        };
        let version = version
            .parse::<u32>()
            .map_err(|_| MealKeyError::Format(s.to_string()))?;
        MealKey::new(day, meal, version)
    }
}

/// A meal text: first line is the title, the rest is the body with
/// ingredient annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealText {
    pub title: String,
    pub body: String,
}

impl MealText {
    pub fn parse(text: &str) -> Self {
        let mut lines = text.split('\n');
        let title = lines.next().unwrap_or_default().trim_end_matches('\r').to_string();
        let body = lines.collect::<Vec<_>>().join("\n");
        Self { title, body }
    }

    pub fn mentions(&self) -> Vec<IngredientMention> {
        parse_ingredients(&self.body)
    }
}

/// Meal texts by key.
#[derive(Debug, Clone, Default)]
pub struct MealPlan {
    meals: BTreeMap<MealKey, MealText>,
}

impl MealPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: MealKey, meal: MealText) {
        self.meals.insert(key, meal);
    }

    pub fn get(&self, key: &MealKey) -> Option<&MealText> {
        self.meals.get(key)
    }

    pub fn len(&self) -> usize {
        self.meals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }

    /// Reads `{day}_{meal}_{version}.md` (or `.txt`) for every combination in
    /// `dir`. Missing or unreadable files are skipped.
    pub async fn load_dir(dir: &Path) -> Result<Self> {
        if !tokio::fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(anyhow!("Meal directory not found at: {:?}", dir));
        }

        let mut plan = MealPlan::new();
        for key in MealKey::all() {
            for extension in MEAL_FILE_EXTENSIONS {
                let path = dir.join(format!("{}.{}", key.file_stem(), extension));
                match tokio::fs::read_to_string(&path).await {
                    Ok(content) => {
                        plan.insert(key.clone(), MealText::parse(&content));
                        break;
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable meal file");
                        break;
                    }
                }
            }
        }
        info!(dir = %dir.display(), meals = plan.len(), "meal plan loaded");
        Ok(plan)
    }
}

/// A meal version with the number of servings chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub key: MealKey,
    pub servings: u32,
}

impl FromStr for Selection {
    type Err = MealKeyError;

    /// `monday-morning-1=2`, or `monday-morning-1` for one serving.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, servings) = match s.split_once('=') {
            Some((key, count)) => {
                let servings = count
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| MealKeyError::ServingCount(count.trim().to_string()))?;
                (key, servings)
            }
            None => (s, 1),
        };
        Ok(Selection {
            key: key.parse()?,
            servings,
        })
    }
}

/// Serving multipliers per meal version. Zero means not selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selections {
    servings: BTreeMap<MealKey, u32>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: MealKey, servings: u32) {
        if servings == 0 {
            self.servings.remove(&key);
        } else {
            self.servings.insert(key, servings);
        }
    }

    pub fn increment(&mut self, key: MealKey) -> u32 {
        let count = self.servings.entry(key).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn get(&self, key: &MealKey) -> u32 {
        self.servings.get(key).copied().unwrap_or(0)
    }

    /// Selected meals with a non-zero serving count.
    pub fn selected(&self) -> impl Iterator<Item = (&MealKey, u32)> {
        self.servings.iter().map(|(k, &n)| (k, n)).filter(|(_, n)| *n > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.servings.is_empty()
    }

    pub fn total_servings(&self) -> u32 {
        self.servings.values().fold(0u32, |total, &n| total.saturating_add(n))
    }
}

impl FromIterator<Selection> for Selections {
    /// Repeated keys add up, saturating at `u32::MAX`.
    fn from_iter<T: IntoIterator<Item = Selection>>(iter: T) -> Self {
        let mut selections = Selections::new();
        for selection in iter {
            let current = selections.get(&selection.key);
            selections.set(selection.key, current.saturating_add(selection.servings));
        }
        selections
    }
}

/// What to do with mentions that give no gram quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MissingQuantityPolicy {
    /// Contribute nothing; the name is reported as unquantified.
    #[default]
    Skip,
    /// Count each unquantified mention as this many grams per serving.
    AssumeGrams(f64),
}

/// Ingredient amounts of the selected meals, multiplied by servings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedIngredients {
    pub pairs: Vec<(String, f64)>,
    /// Lower-cased names that were skipped for lack of a quantity.
    pub unquantified: BTreeSet<String>,
}

pub fn flatten_selections(
    plan: &MealPlan,
    selections: &Selections,
    policy: MissingQuantityPolicy,
) -> FlattenedIngredients {
    let mut flattened = FlattenedIngredients::default();

    for (key, servings) in selections.selected() {
        let Some(meal) = plan.get(key) else {
            warn!(meal = %key, "selected meal is not in the plan");
            continue;
        };
        let multiplier = f64::from(servings);
        for mention in meal.mentions() {
            let grams = match (mention.quantity_grams, policy) {
                (Some(grams), _) => grams,
                (None, MissingQuantityPolicy::AssumeGrams(grams)) => grams,
                (None, MissingQuantityPolicy::Skip) => {
                    debug!(meal = %key, ingredient = %mention.ingredient_name, "no quantity, skipped");
                    flattened.unquantified.insert(normalize_name(&mention.ingredient_name));
                    continue;
                }
            };
            flattened.pairs.push((mention.ingredient_name, grams * multiplier));
        }
    }

    flattened
}

/// Aggregation over a whole selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanSummary {
    pub aggregate: Aggregate,
    pub unquantified: BTreeSet<String>,
}

pub fn aggregate_selections(
    data: &FoodData,
    plan: &MealPlan,
    selections: &Selections,
    policy: MissingQuantityPolicy,
) -> PlanSummary {
    let flattened = flatten_selections(plan, selections, policy);
    PlanSummary {
        aggregate: aggregate(data, flattened.pairs),
        unquantified: flattened.unquantified,
    }
}
