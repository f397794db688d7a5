//! Arbitrary precision numbers using dashu
//!
//! Conversion arithmetic runs on dashu-float decimals (DBig) instead of
//! binary floats, so factors such as 0.001 or 1.8 keep the exact value they
//! were written with and rounding to a fixed number of decimal places is
//! exact.

use dashu_float::DBig;
use dashu_float::ops::Abs;
use dashu_int::IBig;
use thiserror::Error;

/// Error type for number operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumberError {
    #[error("Invalid number format: {0}")]
    ParseError(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Domain error: {0}")]
    DomainError(String),
}

/// Working precision for calculations (decimal digits)
const DEFAULT_PRECISION: usize = 50;

/// Arbitrary precision decimal number
///
/// All operations return Results or new Numbers - never panic.
#[derive(Debug, Clone)]
pub struct Number {
    inner: DBig,
}

impl Number {
    // ========== Construction ==========

    fn with_work_precision(val: DBig) -> DBig {
        val.with_precision(DEFAULT_PRECISION).value()
    }

    /// Create from string representation
    /// Supports: "123", "3.14", "-42"
    pub fn from_str(s: &str) -> Result<Self, NumberError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NumberError::ParseError(String::new()));
        }

        let inner: DBig = s.parse()
            .map_err(|_| NumberError::ParseError(s.to_string()))?;

        Ok(Self { inner: Self::with_work_precision(inner) })
    }

    /// Create from i64 with working precision
    pub fn from_i64(n: i64) -> Self {
        Self { inner: Self::with_work_precision(DBig::from(n)) }
    }

    /// Create from f64 through its shortest round-trip decimal form.
    ///
    /// `0.1_f64` becomes exactly `0.1`, not the binary expansion
    /// `0.1000000000000000055511151231257827...`.
    pub fn from_f64(f: f64) -> Result<Self, NumberError> {
        if !f.is_finite() {
            return Err(NumberError::DomainError(format!("{} is not a finite number", f)));
        }
        if f == 0.0 {
            return Ok(Self::from_i64(0));
        }
        // Display for f64 never uses exponent notation
        Self::from_str(&f.to_string())
    }

    // ========== Predicates ==========

    pub fn is_zero(&self) -> bool {
        self.inner == DBig::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.inner < DBig::ZERO
    }

    // ========== Basic Arithmetic ==========

    pub fn add(&self, other: &Self) -> Self {
        Self { inner: &self.inner + &other.inner }
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self { inner: &self.inner - &other.inner }
    }

    pub fn mul(&self, other: &Self) -> Self {
        Self { inner: &self.inner * &other.inner }
    }

    /// Safe division (returns Result, never panics)
    pub fn checked_div(&self, other: &Self) -> Result<Self, NumberError> {
        if other.is_zero() {
            Err(NumberError::DivisionByZero)
        } else {
            Ok(Self { inner: &self.inner / &other.inner })
        }
    }

    // ========== Rounding ==========

    /// Round to `places` decimal places, ties away from zero.
    ///
    /// `1.00005` rounds to `1.0001` and `-2.50005` to `-2.5001`.
    pub fn round_half_away(&self, places: u32) -> Self {
        let places = places as isize;
        let scale = Self::with_work_precision(DBig::from_parts(IBig::ONE, places));
        let half = Self::with_work_precision(DBig::from_parts(IBig::from(5), -1));

        let scaled = &self.inner * &scale;
        let shifted = &Abs::abs(scaled) + &half;
        let magnitude = shifted.floor();

        let (significand, exponent) = magnitude.into_repr().into_parts();
        let significand = if self.is_negative() { -significand } else { significand };

        Self { inner: DBig::from_parts(significand, exponent - places) }
    }

    // ========== Export ==========

    /// Convert to the nearest f64, `None` when out of range.
    pub fn to_f64(&self) -> Option<f64> {
        // DBig stores significand * 10^exponent; std parsing of the
        // scientific form is correctly rounded.
        let (significand, exponent) = self.inner.clone().into_repr().into_parts();
        let f: f64 = format!("{}e{}", significand, exponent).parse().ok()?;
        if f.is_finite() {
            Some(f)
        } else {
            None
        }
    }
}

// ========== Trait Implementations ==========

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_f64() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "{}", self.inner),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.partial_cmp(&other.inner).unwrap_or(std::cmp::Ordering::Equal)
    }
}
