use anyhow::Result;
use mealplan_nutrients::calorie_normalizer::{normalize, NormalizationSettings};
use mealplan_nutrients::food_data::{FoodDataSource, FoodStore, ENERGY};
use mealplan_nutrients::meal_aggregator::aggregate;
use mealplan_nutrients::meal_plan::{aggregate_selections, MealPlan, MissingQuantityPolicy, Selection, Selections};
use mealplan_nutrients::nutrient_resolver::{resolve, Resolution};
use mealplan_nutrients::parse_ingredients;
use mealplan_nutrients::report::group_ingredients_by_category;
use mealplan_nutrients::StoreError;
use std::path::Path;
use tempfile::TempDir;

const FOODDATA_JSON: &str = r#"{
    "Oats": {
        "category": "Cereal Grains and Pasta",
        "portion_unit_name": "cup",
        "portion_gram_weight": 80,
        "nutrients": {
            "Energy": {"amount": 380, "unit_name": "kcal", "category": "Energy", "drv": 2000},
            "Protein": {"amount": 13, "unit_name": "g", "category": "Macronutrients", "drv": 50}
        }
    },
    "Milk": {
        "category": "Dairy and Egg Products",
        "portion_unit_name": "cup",
        "portion_gram_weight": 244,
        "nutrients": {
            "Energy": {"amount": 60, "unit_name": "kcal", "category": "Energy", "drv": 2000},
            "Protein": {"amount": 3.2, "unit_name": "g", "category": "Macronutrients", "drv": 50},
            "Calcium": {"amount": 120, "unit_name": "mg", "category": "Minerals", "drv": 1300}
        }
    },
    "salt": {
        "category": "Spices and Herbs",
        "portion_unit_name": null,
        "portion_gram_weight": "N/A",
        "nutrients": {
            "Sodium": {"amount": 38758, "unit_name": "mg", "category": "Minerals", "drv": 2300}
        }
    }
}"#;

fn fixture() -> Result<TempDir> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("fooddata.json"), FOODDATA_JSON)?;
    let meals = dir.path().join("meals");
    std::fs::create_dir(&meals)?;
    std::fs::write(
        meals.join("monday_morning_1.md"),
        "Porridge\nSimmer {80g of {Oats}} in {250 g of {Milk}}.\nFinish with {pinch of {salt}} and {{cinnamon}}.",
    )?;
    std::fs::write(
        meals.join("monday_evening_2.md"),
        "Brined beans\nSoak {300g of {Beans, mystery}} with {5g of {SALT}}.",
    )?;
    Ok(dir)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

async fn load_store(dir: &Path) -> Result<FoodStore> {
    let store = FoodStore::new(FoodDataSource::JsonFile(dir.join("fooddata.json")));
    store.ensure_loaded().await?;
    Ok(store)
}

#[tokio::test]
async fn test_full_plan_aggregation() -> Result<()> {
    let dir = fixture()?;
    let store = load_store(dir.path()).await?;
    let data = store.snapshot().expect("store loaded");
    let plan = MealPlan::load_dir(&dir.path().join("meals")).await?;
    assert_eq!(plan.len(), 2);

    let selections: Selections = ["monday-morning-1=2", "monday-evening-2"]
        .iter()
        .map(|s| s.parse::<Selection>())
        .collect::<Result<Selections, _>>()?;

    let summary = aggregate_selections(&data, &plan, &selections, MissingQuantityPolicy::Skip);
    let totals = &summary.aggregate.raw_totals;
    assert_eq!(totals.get("oats"), Some(&160.0));
    assert_eq!(totals.get("milk"), Some(&500.0));
    assert_eq!(totals.get("salt"), Some(&5.0));
    assert_eq!(totals.get("beans, mystery"), Some(&300.0));
    assert!(summary.aggregate.not_found.contains("beans, mystery"));
    assert!(summary.unquantified.contains("cinnamon"));
    assert!(summary.unquantified.contains("salt"));

    let nutrients = &summary.aggregate.nutrients;
    assert!(close(nutrients.energy(), 380.0 * 1.6 + 60.0 * 5.0));
    assert!(close(nutrients.amount("Protein").unwrap(), 13.0 * 1.6 + 3.2 * 5.0));
    assert!(close(nutrients.amount("Sodium").unwrap(), 38758.0 * 0.05));

    let normalized = NormalizationSettings::default().apply(nutrients);
    assert!(close(normalized.energy(), 2500.0));
    let factor = 2500.0 / nutrients.energy();
    assert!(close(normalized.amount("Calcium").unwrap(), nutrients.amount("Calcium").unwrap() * factor));

    let groups = group_ingredients_by_category(&data, totals);
    assert_eq!(groups["Cereal Grains and Pasta"][0].portion.as_deref(), Some("2.00 cups"));
    assert!(!groups["Other"][0].recognised);
    Ok(())
}

#[tokio::test]
async fn test_parse_resolve_normalize_properties() -> Result<()> {
    let dir = fixture()?;
    let store = load_store(dir.path()).await?;
    let data = store.snapshot().expect("store loaded");

    let mentions = parse_ingredients("{150g of {salt}}");
    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0].quantity_grams, Some(150.0));
    assert_eq!(mentions[0].ingredient_name, "salt");
    assert_eq!(mentions[0].raw_span, "{150g of {salt}}");

    let Resolution::Scaled(salt) = resolve(&data, "salt", Some(150.0)) else {
        panic!("salt should resolve");
    };
    assert!(close(salt.amount("Sodium").unwrap(), 38758.0 * 1.5));
    assert_eq!(resolve(&data, "unobtainium", Some(10.0)), Resolution::NotFound);

    let whole = aggregate(&data, [("Oats", 150.0)]);
    let split = aggregate(&data, [("Oats", 100.0), ("Oats", 50.0)]);
    assert!(close(whole.nutrients.energy(), split.nutrients.energy()));

    let mut vector = aggregate(&data, [("Oats", 500.0), ("Milk", 166.666_666_666_666_67)]).nutrients;
    assert!(close(vector.energy(), 2000.0));
    let normalized = normalize(&vector, 2500.0, true);
    assert!(close(normalized.energy(), 2500.0));
    for (name, nutrient) in &vector {
        assert!(close(normalized.amount(name).unwrap(), nutrient.amount * 1.25));
    }
    assert_eq!(normalize(&vector, 2500.0, false), vector);

    vector = aggregate(&data, [("salt", 10.0)]).nutrients;
    assert!(vector.get(ENERGY).is_none());
    assert_eq!(normalize(&vector, 2500.0, true), vector);
    Ok(())
}

#[tokio::test]
async fn test_store_reports_unavailable_and_recovers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("fooddata.json");
    let store = FoodStore::new(FoodDataSource::JsonFile(path.clone()));

    let err = store.load().await.unwrap_err();
    assert!(matches!(err, StoreError::DataUnavailable { .. }));
    assert!(!store.is_loaded());

    std::fs::write(&path, FOODDATA_JSON)?;
    let data = store.load().await?;
    assert_eq!(data.len(), 3);
    assert_eq!(store.get_category("MILK"), "Dairy and Egg Products");
    assert_eq!(store.find_matches("l", 10), vec!["Milk".to_string(), "salt".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_two_file_csv_source() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let foods = dir.path().join("fooddata.csv");
    let nutrients = dir.path().join("nutrients.csv");
    std::fs::write(
        &nutrients,
        "nutrientName,nutrient_id,unit_name,nutrient_category,drv,nutrient_order\nEnergy,1008,kcal,Energy,2000,0\n",
    )?;
    std::fs::write(
        &foods,
        "foodName,food_category,portion_unit_name,portion_gram_weight,Energy\n\"Bananas, raw\",Fruits,cup,150,89\n",
    )?;

    let source = FoodDataSource::from_location(&foods.display().to_string(), Some(nutrients));
    let store = FoodStore::new(source);
    let data = store.load().await?;

    let mentions = parse_ingredients("{120g of {Bananas, raw}}");
    let result = aggregate(
        &data,
        mentions
            .iter()
            .map(|m| (m.ingredient_name.as_str(), m.quantity_grams.unwrap_or(0.0))),
    );
    assert!(close(result.nutrients.energy(), 89.0 * 1.2));
    assert_eq!(store.get_portion("bananas, RAW").unwrap().gram_weight, 150.0);
    Ok(())
}
