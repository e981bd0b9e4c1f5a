pub mod calorie_normalizer;
pub mod cli;
pub mod config;
pub mod error;
pub mod food_data;
pub mod ingredient_parser;
pub mod meal_aggregator;
pub mod meal_plan;
pub mod nutrient_resolver;
pub mod report;

pub use calorie_normalizer::normalize;
pub use error::{MealKeyError, ParseError, StoreError};
pub use ingredient_parser::{parse_ingredients, IngredientMention};
pub use meal_aggregator::{aggregate, Aggregate};
pub use nutrient_resolver::{resolve, Resolution};
