use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing::{debug, info};

use mealplan_nutrients::calorie_normalizer::{clamp_target, NormalizationSettings};
use mealplan_nutrients::cli::parse_args;
use mealplan_nutrients::config::AppConfig;
use mealplan_nutrients::food_data::{FoodStore, DEFAULT_MATCH_LIMIT};
use mealplan_nutrients::meal_plan::{aggregate_selections, MealPlan, MissingQuantityPolicy, Selections};
use mealplan_nutrients::report::{group_ingredients_by_category, group_nutrients_by_category, write_report};

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = parse_args();

    let log_level = if cli_args.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("mealplan_nutrients={}", log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let config = cli_args.apply_to(AppConfig::from_env()?);
    debug!(?config, "configuration resolved");

    let store = FoodStore::new(config.food_data_source()).with_load_timeout(config.load_timeout);
    let food_data = store
        .load()
        .await
        .with_context(|| format!("Failed to load food data from '{}'", config.fooddata))?;

    let mut stdout = io::stdout().lock();

    if let Some(partial) = &cli_args.search {
        for name in food_data.find_matches(partial, DEFAULT_MATCH_LIMIT) {
            writeln!(stdout, "{}", name)?;
        }
        return Ok(());
    }

    let plan = MealPlan::load_dir(&config.meals_dir)
        .await
        .with_context(|| format!("Failed to read meal plan from {:?}", config.meals_dir))?;

    let selections: Selections = cli_args.selections.iter().cloned().collect();
    if selections.is_empty() {
        info!("no meals selected");
    }

    let policy = match cli_args.assume_grams {
        Some(grams) => MissingQuantityPolicy::AssumeGrams(grams),
        None => MissingQuantityPolicy::Skip,
    };
    let summary = aggregate_selections(&food_data, &plan, &selections, policy);

    let settings = NormalizationSettings {
        enabled: !cli_args.no_normalize,
        target_calories: clamp_target(config.target_calories),
    };
    let nutrients = settings.apply(&summary.aggregate.nutrients);

    let heading = if settings.enabled {
        format!("Nutrients normalized to {:.0} kcal", settings.target_calories)
    } else {
        "Nutrients for the selected plan (no normalization)".to_string()
    };

    write_report(
        &mut stdout,
        &heading,
        &group_ingredients_by_category(&food_data, &summary.aggregate.raw_totals),
        &group_nutrients_by_category(&nutrients),
    )?;

    if !summary.unquantified.is_empty() {
        let names: Vec<&str> = summary.unquantified.iter().map(String::as_str).collect();
        writeln!(stdout, "\nWithout a gram quantity: {}", names.join(", "))?;
    }

    Ok(())
}
