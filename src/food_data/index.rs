use std::collections::HashMap;

use super::record::{FoodRecord, NutrientVector, Portion, DEFAULT_CATEGORY};

/// Default number of names returned by [`FoodData::find_matches`].
pub const DEFAULT_MATCH_LIMIT: usize = 10;

/// Lookup key for a food name: trimmed and lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Loaded, immutable food reference dataset.
///
/// Records keep their load order; lookups are case-insensitive through a
/// lower-cased key index. A later record whose name collides with an earlier
/// one replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct FoodData {
    records: Vec<FoodRecord>,
    index: HashMap<String, usize>,
}

impl FoodData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: FoodRecord) {
        let key = normalize_name(&record.name);
        match self.index.get(&key) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FoodRecord> {
        self.index
            .get(&normalize_name(name))
            .map(|&slot| &self.records[slot])
    }

    pub fn category(&self, name: &str) -> &str {
        self.get(name)
            .map(|r| r.category.as_str())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    /// Per-100 g nutrients of the named food.
    pub fn nutrients(&self, name: &str) -> Option<&NutrientVector> {
        self.get(name).map(|r| &r.nutrients)
    }

    pub fn portion(&self, name: &str) -> Option<&Portion> {
        self.get(name).and_then(|r| r.portion.as_ref())
    }

    /// Names containing `partial` (case-insensitive), first `limit` in store
    /// order. No relevance ranking.
    pub fn find_matches(&self, partial: &str, limit: usize) -> Vec<&str> {
        let needle = normalize_name(partial);
        self.records
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .take(limit)
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FoodRecord> {
        self.records.iter()
    }
}

impl FromIterator<FoodRecord> for FoodData {
    fn from_iter<T: IntoIterator<Item = FoodRecord>>(iter: T) -> Self {
        let mut data = FoodData::new();
        for record in iter {
            data.insert(record);
        }
        data
    }
}
