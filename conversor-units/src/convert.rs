//! Conversion engine
//!
//! Converts a value between two units of one category by going through the
//! category's base unit:
//!
//! ```text
//! base   = (value - input.increment) / input.factor
//! output = base * output.factor + output.increment
//! ```
//!
//! Increments only take part for affine categories. Arithmetic is done on
//! decimal [`Number`]s and the result is rounded to [`DECIMAL_PLACES`],
//! ties away from zero. The engine holds no mutable state.

use serde::{Serialize, Deserialize};
use conversor_core::{ConvertError, Number};
use crate::catalog::Catalog;
use crate::parse::parse_value;
use crate::unit::Unit;

/// Decimal places kept in every converted value
pub const DECIMAL_PLACES: u32 = 4;

/// A single conversion to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub category: String,
    pub input_unit: String,
    pub output_unit: String,
    pub input_value: f64,
}

/// A performed conversion: the request plus its result.
///
/// Serializes with the same keys the browser front end keeps in local
/// storage, so it doubles as the persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub category: String,
    pub input_value: f64,
    pub input_unit: String,
    pub output_unit: String,
    pub output_value: f64,
}

/// Round to [`DECIMAL_PLACES`], ties away from zero
pub fn round4(value: f64) -> Result<f64, ConvertError> {
    let n = Number::from_f64(value)
        .map_err(|_| ConvertError::InvalidValue(format!("{} is not a finite number", value)))?;
    finish(&n)
}

fn finish(n: &Number) -> Result<f64, ConvertError> {
    n.round_half_away(DECIMAL_PLACES)
        .to_f64()
        .ok_or_else(|| ConvertError::InvalidValue(format!("result {} is out of range", n)))
}

fn parameter(value: f64, what: &str, unit: &Unit) -> Result<Number, ConvertError> {
    Number::from_f64(value).map_err(|_| ConvertError::invalid_config(format!(
        "unit '{}' has non-finite {}", unit.name, what
    )))
}

/// Convert `value` from `input` to `output` with the raw base-unit formula.
///
/// Fails with `InvalidValue` for a non-finite value and with
/// `InvalidConfiguration` when a unit's factor is zero or non-finite.
pub fn convert_between(input: &Unit, output: &Unit, affine: bool, value: f64) -> Result<f64, ConvertError> {
    let value = Number::from_f64(value)
        .map_err(|_| ConvertError::InvalidValue(format!("{} is not a finite number", value)))?;

    // Self-conversion is exact; no round trip through the base unit
    if input == output {
        return finish(&value);
    }

    let input_factor = parameter(input.factor, "factor", input)?;
    let output_factor = parameter(output.factor, "factor", output)?;

    let shifted = if affine {
        value.sub(&parameter(input.increment, "increment", input)?)
    } else {
        value
    };

    let base = shifted.checked_div(&input_factor).map_err(|_| ConvertError::invalid_config(format!(
        "unit '{}' has a zero factor", input.name
    )))?;

    let scaled = base.mul(&output_factor);
    let result = if affine {
        scaled.add(&parameter(output.increment, "increment", output)?)
    } else {
        scaled
    };

    finish(&result)
}

/// Stateless converter over a loaded catalog
#[derive(Debug, Clone, Copy)]
pub struct Converter<'a> {
    catalog: &'a Catalog,
}

impl<'a> Converter<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Convert `value` from `input_unit` to `output_unit` within `category`
    pub fn convert(
        &self,
        category: &str,
        input_unit: &str,
        output_unit: &str,
        value: f64,
    ) -> Result<f64, ConvertError> {
        if !value.is_finite() {
            return Err(ConvertError::InvalidValue(format!("{} is not a finite number", value)));
        }

        let category = self.catalog.category(category)?;
        let input = category.unit(input_unit)?;
        let output = category.unit(output_unit)?;

        convert_between(input, output, category.is_affine(), value)
    }

    /// Like [`Converter::convert`], for text typed by a user
    pub fn convert_text(
        &self,
        category: &str,
        input_unit: &str,
        output_unit: &str,
        text: &str,
    ) -> Result<f64, ConvertError> {
        let value = parse_value(text)?;
        self.convert(category, input_unit, output_unit, value)
    }

    pub fn execute(&self, request: &ConversionRequest) -> Result<Conversion, ConvertError> {
        let output_value = self.convert(
            &request.category,
            &request.input_unit,
            &request.output_unit,
            request.input_value,
        )?;

        Ok(Conversion {
            category: request.category.clone(),
            input_value: request.input_value,
            input_unit: request.input_unit.clone(),
            output_unit: request.output_unit.clone(),
            output_value,
        })
    }

    /// Swap the units and convert the previous output back.
    pub fn swap(&self, current: &Conversion) -> Result<Conversion, ConvertError> {
        self.execute(&ConversionRequest {
            category: current.category.clone(),
            input_unit: current.output_unit.clone(),
            output_unit: current.input_unit.clone(),
            input_value: current.output_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::unit::UnitRecord;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    /// Unrounded conversion for multiplicative categories
    fn raw(catalog: &Catalog, category: &str, from: &str, to: &str, value: &Number) -> Number {
        let from = Number::from_f64(catalog.get_unit_params(category, from).unwrap().factor).unwrap();
        let to = Number::from_f64(catalog.get_unit_params(category, to).unwrap().factor).unwrap();
        value.checked_div(&from).unwrap().mul(&to)
    }

    #[test]
    fn test_kilometers_to_miles() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        assert_eq!(conv.convert("Length", "Kilometers", "Miles", 1.0).unwrap(), 0.6214);
        assert_eq!(conv.convert("Length", "Kilometers", "Miles", 100.0).unwrap(), 62.1371);
    }

    #[test]
    fn test_common_conversions() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        assert_eq!(conv.convert("Length", "Meters", "Centimeters", 1.5).unwrap(), 150.0);
        assert_eq!(conv.convert("Length", "Feet", "Meters", 10.0).unwrap(), 3.048);
        assert_eq!(conv.convert("Weight", "Kilograms", "Pounds", 1.0).unwrap(), 2.2046);
        assert_eq!(conv.convert("Weight", "Grams", "Kilograms", 250.0).unwrap(), 0.25);
        assert_eq!(conv.convert("Speed", "Kilometers per hour", "Meters per second", 36.0).unwrap(), 10.0);
        assert_eq!(conv.convert("Speed", "Kilometers per hour", "Miles per hour", 100.0).unwrap(), 62.1371);
    }

    #[test]
    fn test_celsius_to_fahrenheit() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        assert_eq!(conv.convert("Temperature", "Celsius", "Fahrenheit", 0.0).unwrap(), 32.0);
        assert_eq!(conv.convert("Temperature", "Celsius", "Fahrenheit", 100.0).unwrap(), 212.0);
        assert_eq!(conv.convert("Temperature", "Celsius", "Fahrenheit", -40.0).unwrap(), -40.0);
        assert_eq!(conv.convert("Temperature", "Celsius", "Fahrenheit", 37.0).unwrap(), 98.6);
    }

    #[test]
    fn test_temperature_from_offset_units() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        assert_eq!(conv.convert("Temperature", "Fahrenheit", "Celsius", 212.0).unwrap(), 100.0);
        assert_eq!(conv.convert("Temperature", "Fahrenheit", "Celsius", 32.0).unwrap(), 0.0);
        assert_eq!(conv.convert("Temperature", "Kelvin", "Celsius", 0.0).unwrap(), -273.15);
        assert_eq!(conv.convert("Temperature", "Celsius", "Kelvin", 0.0).unwrap(), 273.15);
        assert_eq!(conv.convert("Temperature", "Fahrenheit", "Kelvin", 32.0).unwrap(), 273.15);
    }

    #[test]
    fn test_zero_input() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        assert_eq!(conv.convert("Length", "Kilometers", "Miles", 0.0).unwrap(), 0.0);
        assert_eq!(conv.convert("Temperature", "Kelvin", "Fahrenheit", 0.0).unwrap(), -459.67);
    }

    #[test]
    fn test_identity_for_every_unit() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        let values = [0.0, 1.0, -17.25, 0.00005, 123456.78915, 98.6];
        for category in catalog.list_categories() {
            for unit in catalog.list_units(category).unwrap() {
                for &x in &values {
                    let y = conv.convert(category, unit, unit, x).unwrap();
                    assert_eq!(y, round4(x).unwrap(), "{} {} {}", category, unit, x);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_within_rounding_error() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        let values = [1.0, 2.5, -3.75, 42.0, 1000.0];
        for category in catalog.categories() {
            for a in category.units() {
                for b in category.units() {
                    // The intermediate is rounded in b's units; that error
                    // comes back scaled by a.factor / b.factor.
                    let tolerance = 0.5e-4 * (a.factor / b.factor).abs() + 0.5e-4 + 1e-9;
                    for &x in &values {
                        let there = conv.convert(category.name(), &a.name, &b.name, x).unwrap();
                        let back = conv.convert(category.name(), &b.name, &a.name, there).unwrap();
                        assert_abs_diff_eq!(back, round4(x).unwrap(), epsilon = tolerance);
                    }
                }
            }
        }
    }

    #[test]
    fn test_multiplicative_linearity() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        let x = 3.7;
        for category in ["Length", "Weight", "Speed"] {
            let units = catalog.list_units(category).unwrap();
            for &a in &units {
                for &b in &units {
                    for k in [2.0, 10.0, 0.5] {
                        let direct = conv.convert(category, a, b, k * x).unwrap();
                        let scaled = Number::from_f64(k).unwrap()
                            .mul(&raw(&catalog, category, a, b, &Number::from_f64(x).unwrap()));
                        let expected = scaled.round_half_away(DECIMAL_PLACES).to_f64().unwrap();
                        assert_eq!(direct, expected, "{} {} -> {} k={}", category, a, b, k);
                    }
                }
            }
        }
    }

    #[test]
    fn test_unknown_category() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        let err = conv.convert("Bogus", "x", "y", 1.0).unwrap_err();
        assert_eq!(err, ConvertError::UnknownCategory("Bogus".to_string()));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unknown_unit() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        let err = conv.convert("Length", "Kilometers", "Leagues", 1.0).unwrap_err();
        assert_eq!(err, ConvertError::unknown_unit("Length", "Leagues"));
        let err = conv.convert("Length", "Celsius", "Miles", 1.0).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_non_finite_input() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = conv.convert("Length", "Kilometers", "Miles", bad).unwrap_err();
            assert!(matches!(err, ConvertError::InvalidValue(_)));
        }
    }

    #[test]
    fn test_value_is_checked_before_lookup() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        let err = conv.convert("Bogus", "x", "y", f64::NAN).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidValue(_)));
    }

    #[test]
    fn test_convert_text() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        assert_eq!(conv.convert_text("Length", "Kilometers", "Miles", " 1 ").unwrap(), 0.6214);
        let err = conv.convert_text("Length", "Kilometers", "Miles", "one").unwrap_err();
        assert!(matches!(err, ConvertError::InvalidValue(_)));
    }

    #[test]
    fn test_result_out_of_range() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        let err = conv.convert("Weight", "Tonnes", "Milligrams", 1e300).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidValue(_)));
    }

    #[test]
    fn test_zero_factor_is_configuration_error() {
        let broken = Unit::new("Broken", 0.0);
        let meters = Unit::new("Meters", 1.0);
        let err = convert_between(&broken, &meters, false, 1.0).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_increments_ignored_outside_affine_categories() {
        let a = Unit::with_increment("A", 1.0, 10.0);
        let b = Unit::with_increment("B", 2.0, 10.0);
        assert_eq!(convert_between(&a, &b, false, 3.0).unwrap(), 6.0);
        assert_eq!(convert_between(&a, &b, true, 3.0).unwrap(), -4.0);
    }

    #[test]
    fn test_declared_affine_category_from_records() {
        let catalog = Catalog::from_records(vec![
            UnitRecord::new("Temperature", "Celsius", 1.0, 0.0),
            UnitRecord::new("Temperature", "Fahrenheit", 1.8, 32.0),
        ]).unwrap();
        let conv = Converter::new(&catalog);
        assert_eq!(conv.convert("Temperature", "Celsius", "Fahrenheit", 100.0).unwrap(), 212.0);
    }

    #[test]
    fn test_execute_builds_snapshot() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        let conversion = conv.execute(&ConversionRequest {
            category: "Length".into(),
            input_unit: "Kilometers".into(),
            output_unit: "Miles".into(),
            input_value: 5.0,
        }).unwrap();
        assert_eq!(conversion.output_value, 3.1069);

        let json = serde_json::to_value(&conversion).unwrap();
        assert_eq!(json["inputUnit"], "Kilometers");
        assert_eq!(json["outputValue"], 3.1069);
    }

    #[test]
    fn test_swap() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        let original = conv.execute(&ConversionRequest {
            category: "Temperature".into(),
            input_unit: "Celsius".into(),
            output_unit: "Fahrenheit".into(),
            input_value: 21.5,
        }).unwrap();

        let swapped = conv.swap(&original).unwrap();
        assert_eq!(swapped.input_unit, "Fahrenheit");
        assert_eq!(swapped.output_unit, "Celsius");
        assert_eq!(swapped.input_value, original.output_value);
        assert_eq!(swapped.output_value, 21.5);
    }

    #[test]
    fn test_swap_twice_restores_units_and_value() {
        let catalog = catalog();
        let conv = Converter::new(&catalog);
        let original = conv.execute(&ConversionRequest {
            category: "Length".into(),
            input_unit: "Miles".into(),
            output_unit: "Kilometers".into(),
            input_value: 12.34,
        }).unwrap();

        let back = conv.swap(&conv.swap(&original).unwrap()).unwrap();
        assert_eq!(back.input_unit, original.input_unit);
        assert_eq!(back.output_unit, original.output_unit);
        assert_abs_diff_eq!(back.input_value, original.input_value, epsilon = 1e-4);
        assert_abs_diff_eq!(back.output_value, original.output_value, epsilon = 2e-4);
    }

    #[test]
    fn test_round4_ties() {
        assert_eq!(round4(1.00005).unwrap(), 1.0001);
        assert_eq!(round4(-2.50005).unwrap(), -2.5001);
        assert!(round4(f64::NAN).is_err());
    }
}
