use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::calorie_normalizer::DEFAULT_TARGET_CALORIES;
use crate::food_data::FoodDataSource;

pub const FOODDATA_ENV_VAR: &str = "MEALPLAN_FOODDATA";
pub const NUTRIENTS_CSV_ENV_VAR: &str = "MEALPLAN_NUTRIENTS_CSV";
pub const MEALS_DIR_ENV_VAR: &str = "MEALPLAN_MEALS_DIR";
pub const TARGET_KCAL_ENV_VAR: &str = "MEALPLAN_TARGET_KCAL";
pub const LOAD_TIMEOUT_ENV_VAR: &str = "MEALPLAN_LOAD_TIMEOUT_SECS";

const DEFAULT_FOODDATA: &str = "data/fooddata.json";
const DEFAULT_MEALS_DIR: &str = "meals";
const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// File path or http(s) URL of the food reference data.
    pub fooddata: String,
    pub nutrients_csv: Option<PathBuf>,
    pub meals_dir: PathBuf,
    pub target_calories: f64,
    /// `None` disables the load timeout.
    pub load_timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fooddata: DEFAULT_FOODDATA.to_string(),
            nutrients_csv: None,
            meals_dir: PathBuf::from(DEFAULT_MEALS_DIR),
            target_calories: DEFAULT_TARGET_CALORIES,
            load_timeout: Some(Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS)),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the environment (and a `.env` file, if present).
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = AppConfig::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(fooddata) = var(FOODDATA_ENV_VAR) {
            config.fooddata = fooddata;
        }
        if let Some(nutrients) = var(NUTRIENTS_CSV_ENV_VAR) {
            config.nutrients_csv = Some(PathBuf::from(nutrients));
        }
        if let Some(dir) = var(MEALS_DIR_ENV_VAR) {
            config.meals_dir = PathBuf::from(dir);
        }
        if let Some(target) = var(TARGET_KCAL_ENV_VAR) {
            config.target_calories = target
                .parse::<f64>()
                .with_context(|| format!("{} must be a number, got '{}'", TARGET_KCAL_ENV_VAR, target))?;
        }
        if let Some(secs) = var(LOAD_TIMEOUT_ENV_VAR) {
            let secs = secs
                .parse::<u64>()
                .with_context(|| format!("{} must be whole seconds, got '{}'", LOAD_TIMEOUT_ENV_VAR, secs))?;
            config.load_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn food_data_source(&self) -> FoodDataSource {
        FoodDataSource::from_location(&self.fooddata, self.nutrients_csv.clone())
    }
}
