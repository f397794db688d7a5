//! Unit representation with conversion parameters

use std::fmt;
use serde::{Serialize, Deserialize};

/// A unit inside one category.
///
/// `factor` scales the category's base unit into this unit:
/// `value_in_unit = base * factor + increment`. `increment` is zero for
/// purely multiplicative categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Display name, unique within its category (e.g. "Kilometers")
    pub name: String,
    /// Units per base unit
    pub factor: f64,
    /// Offset added after scaling (temperature scales)
    #[serde(default)]
    pub increment: f64,
}

/// The numeric parameters of a unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitParams {
    pub factor: f64,
    pub increment: f64,
}

impl Unit {
    /// Create a new unit with proportional conversion (no offset)
    pub fn new(name: &str, factor: f64) -> Self {
        Unit {
            name: name.to_string(),
            factor,
            increment: 0.0,
        }
    }

    /// Create a unit with offset (for temperature conversions)
    pub fn with_increment(name: &str, factor: f64, increment: f64) -> Self {
        Unit {
            name: name.to_string(),
            factor,
            increment,
        }
    }

    /// Check if this unit has an offset (non-proportional conversion)
    pub fn has_increment(&self) -> bool {
        self.increment != 0.0
    }

    pub fn params(&self) -> UnitParams {
        UnitParams {
            factor: self.factor,
            increment: self.increment,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One row of the catalog file: `{category, unit, factor, increment}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub category: String,
    pub unit: String,
    pub factor: f64,
    #[serde(default)]
    pub increment: f64,
}

impl UnitRecord {
    pub fn new(category: &str, unit: &str, factor: f64, increment: f64) -> Self {
        UnitRecord {
            category: category.to_string(),
            unit: unit.to_string(),
            factor,
            increment,
        }
    }

    pub(crate) fn into_unit(self) -> Unit {
        Unit::with_increment(&self.unit, self.factor, self.increment)
    }
}
