//! Unit catalog - categories of mutually convertible units
//!
//! The catalog is built once from JSON (or records) and is read-only
//! afterwards. Every malformed entry is rejected while building, so lookups
//! on a constructed catalog only ever fail with "not found".

use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use conversor_core::ConvertError;
use crate::unit::{Unit, UnitParams, UnitRecord};

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

/// Default input/output pair shown when a category is first selected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultUnits {
    #[serde(rename = "input")]
    pub input_unit: String,
    #[serde(rename = "output")]
    pub output_unit: String,
}

/// Per-category settings of a catalog document
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryConfig {
    name: String,
    #[serde(default)]
    affine: Option<bool>,
    #[serde(default)]
    defaults: Option<DefaultUnits>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    #[serde(default)]
    categories: Vec<CategoryConfig>,
    units: Vec<UnitRecord>,
}


/// A named family of mutually convertible units
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    name: String,
    units: Vec<Unit>,
    affine: bool,
    defaults: Option<DefaultUnits>,
}

impl Category {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units in catalog order
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Whether conversions apply the output unit's increment
    pub fn is_affine(&self) -> bool {
        self.affine
    }

    pub fn unit(&self, name: &str) -> Result<&Unit, ConvertError> {
        self.units.iter()
            .find(|u| u.name == name)
            .ok_or_else(|| ConvertError::unknown_unit(&self.name, name))
    }

    /// Configured defaults, else the first two units in catalog order.
    /// A single-unit category uses that unit on both sides.
    pub fn default_units(&self) -> DefaultUnits {
        if let Some(defaults) = &self.defaults {
            return defaults.clone();
        }
        let first = &self.units[0].name;
        let second = self.units.get(1).map_or(first, |u| &u.name);
        DefaultUnits {
            input_unit: first.clone(),
            output_unit: second.clone(),
        }
    }
}

/// Immutable table of categories and their units
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// The catalog shipped with the crate
    pub fn builtin() -> Result<Self, ConvertError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parse either a bare record list (`[...]`) or a catalog document (`{...}`)
    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        let malformed = |e: serde_json::Error| {
            ConvertError::invalid_config(format!("malformed catalog: {}", e))
        };

        // The opening token picks the shape so serde reports the real
        // field, line and column of a bad entry.
        if json.trim_start().starts_with('[') {
            let records: Vec<UnitRecord> = serde_json::from_str(json).map_err(malformed)?;
            Self::build(Vec::new(), records)
        } else {
            let doc: CatalogDocument = serde_json::from_str(json).map_err(malformed)?;
            Self::build(doc.categories, doc.units)
        }
    }

    /// Build from records only; defaults fall back to catalog order and
    /// affinity is inferred from nonzero increments.
    pub fn from_records(records: Vec<UnitRecord>) -> Result<Self, ConvertError> {
        Self::build(Vec::new(), records)
    }

    fn build(configs: Vec<CategoryConfig>, records: Vec<UnitRecord>) -> Result<Self, ConvertError> {
        let mut pending: Vec<(Category, Option<bool>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for config in configs {
            if config.name.trim().is_empty() {
                return Err(ConvertError::invalid_config("category with an empty name"));
            }
            if index.contains_key(&config.name) {
                return Err(ConvertError::invalid_config(format!(
                    "category '{}' is declared twice", config.name
                )));
            }
            index.insert(config.name.clone(), pending.len());
            pending.push((
                Category {
                    name: config.name,
                    units: Vec::new(),
                    affine: false,
                    defaults: config.defaults,
                },
                config.affine,
            ));
        }

        for record in records {
            validate_record(&record)?;

            let slot = match index.get(&record.category) {
                Some(&i) => i,
                None => {
                    index.insert(record.category.clone(), pending.len());
                    pending.push((
                        Category {
                            name: record.category.clone(),
                            units: Vec::new(),
                            affine: false,
                            defaults: None,
                        },
                        None,
                    ));
                    pending.len() - 1
                }
            };

            let category = &mut pending[slot].0;
            if category.units.iter().any(|u| u.name == record.unit) {
                return Err(ConvertError::invalid_config(format!(
                    "unit '{}' appears twice in category '{}'", record.unit, record.category
                )));
            }
            category.units.push(record.into_unit());
        }

        if pending.is_empty() {
            return Err(ConvertError::invalid_config("catalog has no categories"));
        }

        let categories = pending.into_iter()
            .map(|(category, declared)| finish_category(category, declared))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Catalog { categories, index })
    }

    // ========== Lookups ==========

    /// Category names in configuration order, each listed once
    pub fn list_categories(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn category(&self, name: &str) -> Result<&Category, ConvertError> {
        self.index.get(name)
            .map(|&i| &self.categories[i])
            .ok_or_else(|| ConvertError::UnknownCategory(name.to_string()))
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Unit names of a category in configuration order
    pub fn list_units(&self, category: &str) -> Result<Vec<&str>, ConvertError> {
        let category = self.category(category)?;
        Ok(category.units.iter().map(|u| u.name.as_str()).collect())
    }

    pub fn get_unit(&self, category: &str, unit: &str) -> Result<&Unit, ConvertError> {
        self.category(category)?.unit(unit)
    }

    pub fn get_unit_params(&self, category: &str, unit: &str) -> Result<UnitParams, ConvertError> {
        Ok(self.get_unit(category, unit)?.params())
    }

    pub fn get_default_units(&self, category: &str) -> Result<DefaultUnits, ConvertError> {
        Ok(self.category(category)?.default_units())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn validate_record(record: &UnitRecord) -> Result<(), ConvertError> {
    if record.category.trim().is_empty() {
        return Err(ConvertError::invalid_config(format!(
            "unit '{}' has an empty category name", record.unit
        )));
    }
    if record.unit.trim().is_empty() {
        return Err(ConvertError::invalid_config(format!(
            "category '{}' has a unit with an empty name", record.category
        )));
    }
    if !record.factor.is_finite() || record.factor == 0.0 {
        return Err(ConvertError::invalid_config(format!(
            "unit '{}' in category '{}' has factor {}; factors must be finite and nonzero",
            record.unit, record.category, record.factor
        )));
    }
    if !record.increment.is_finite() {
        return Err(ConvertError::invalid_config(format!(
            "unit '{}' in category '{}' has a non-finite increment",
            record.unit, record.category
        )));
    }
    Ok(())
}

fn finish_category(mut category: Category, declared_affine: Option<bool>) -> Result<Category, ConvertError> {
    if category.units.is_empty() {
        return Err(ConvertError::invalid_config(format!(
            "category '{}' has no units", category.name
        )));
    }

    let has_increment = category.units.iter().any(Unit::has_increment);
    category.affine = match declared_affine {
        Some(false) if has_increment => {
            return Err(ConvertError::invalid_config(format!(
                "category '{}' is declared non-affine but has units with an increment",
                category.name
            )));
        }
        Some(declared) => declared,
        None => has_increment,
    };

    if let Some(defaults) = &category.defaults {
        for unit in [&defaults.input_unit, &defaults.output_unit] {
            if category.unit(unit).is_err() {
                return Err(ConvertError::invalid_config(format!(
                    "default unit '{}' is not part of category '{}'", unit, category.name
                )));
            }
        }
    }

    Ok(category)
}
