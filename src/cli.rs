use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::meal_plan::Selection;

#[derive(Parser, Debug)]
#[command(author, version, about = "Aggregate ingredients and nutrients of selected meal plan meals", long_about = None)]
pub struct Cli {
    /// Selected meals as day-meal-version[=servings], e.g. monday-morning-1=2
    pub selections: Vec<Selection>,

    /// Food reference data: JSON file, CSV file or http(s) URL
    #[arg(long)]
    pub fooddata: Option<String>,

    /// Nutrient metadata CSV for the two-file CSV format
    #[arg(long)]
    pub nutrients_csv: Option<PathBuf>,

    /// Directory holding {day}_{meal}_{version}.md meal texts
    #[arg(short, long)]
    pub meals_dir: Option<PathBuf>,

    /// Energy target for normalization, in kcal (clamped to 1000-4000)
    #[arg(short, long)]
    pub target_kcal: Option<f64>,

    /// Report absolute totals instead of normalizing to the energy target
    #[arg(long)]
    pub no_normalize: bool,

    /// Count annotations without a gram quantity as this many grams
    #[arg(long, value_parser = parse_grams)]
    pub assume_grams: Option<f64>,

    /// List up to 10 food names containing this text and exit
    #[arg(long)]
    pub search: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Accepts finite, non-negative gram amounts.
fn parse_grams(s: &str) -> Result<f64, String> {
    let grams: f64 = s.trim().parse().map_err(|_| format!("'{}' is not a number", s))?;
    if !grams.is_finite() || grams < 0.0 {
        return Err(format!("'{}' must be a finite, non-negative gram amount", s));
    }
    Ok(grams)
}

impl Cli {
    /// Applies command line overrides on top of `config`.
    pub fn apply_to(&self, mut config: AppConfig) -> AppConfig {
        if let Some(fooddata) = &self.fooddata {
            config.fooddata = fooddata.clone();
        }
        if let Some(nutrients) = &self.nutrients_csv {
            config.nutrients_csv = Some(nutrients.clone());
        }
        if let Some(dir) = &self.meals_dir {
            config.meals_dir = dir.clone();
        }
        if let Some(target) = self.target_kcal {
            config.target_calories = target;
        }
        config
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
