//! Parsing of user-entered values

use conversor_core::ConvertError;

/// Parse text typed by a user into a finite number.
///
/// Accepts decimal and scientific forms ("12", "-0.5", "1.5e3"). Empty
/// input, non-numeric text, NaN and infinities are rejected rather than
/// corrected.
pub fn parse_value(text: &str) -> Result<f64, ConvertError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConvertError::InvalidValue("no value entered".to_string()));
    }

    let value: f64 = trimmed.parse()
        .map_err(|_| ConvertError::InvalidValue(format!("'{}' is not a number", trimmed)))?;

    if !value.is_finite() {
        return Err(ConvertError::InvalidValue(format!("'{}' is not a finite number", trimmed)));
    }

    Ok(value)
}
