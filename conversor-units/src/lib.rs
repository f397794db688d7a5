//! Conversor Units - Unit Catalog and Conversion Engine
//!
//! A catalog groups units into categories of mutually convertible units.
//! Every unit is described by a factor (and, for affine categories such as
//! temperature, an increment) relative to the category's implicit base
//! unit. The engine converts between two units of one category through
//! that base unit and rounds to 4 decimal places.
//!
//! Built-in categories:
//! - Length (Kilometers, Meters, Miles, Feet, ...)
//! - Weight (Kilograms, Grams, Pounds, Ounces, ...)
//! - Temperature (Celsius, Fahrenheit, Kelvin) - affine
//! - Speed (Kilometers per hour, Miles per hour, Knots, ...)

mod unit;
mod catalog;
mod convert;
mod parse;

pub use unit::{Unit, UnitParams, UnitRecord};
pub use catalog::{Catalog, Category, DefaultUnits};
pub use convert::{
    Converter, Conversion, ConversionRequest,
    convert_between, round4, DECIMAL_PLACES,
};
pub use parse::parse_value;
pub use conversor_core::ConvertError;
