pub mod data_loader;
pub mod index;
pub mod record;
pub mod store;

pub use data_loader::{load_food_data_csv, load_food_data_json, parse_food_data_csv, parse_food_data_json};
pub use index::{normalize_name, FoodData, DEFAULT_MATCH_LIMIT};
pub use record::{FoodRecord, NutrientAmount, NutrientVector, Portion, DEFAULT_CATEGORY, ENERGY};
pub use store::{FoodDataFetcher, FoodDataSource, FoodStore};
