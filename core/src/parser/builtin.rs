//! Parsers for primitive parameter types.

use std::marker::PhantomData;

use super::Marker;
use super::Parsed;
use super::TypedParser;
use crate::value::ValueType;

/// Magnitude suffixes accepted after numbers. They stack, right to left:
/// `2kr` is `2 * 512 * 1000`.
const MULTIPLIERS: [(char, i64); 5] = [
    ('k', 1_000),
    ('m', 1_000_000),
    ('h', 100),
    ('c', 16),
    ('r', 512),
];

/// Strips trailing magnitude suffixes from `raw`.
///
/// Returns the remaining digits and the combined multiplier, or `None` if
/// the multiplier overflows `i64`.
pub fn apply_multipliers(raw: &str) -> Option<(&str, i64)> {
    let mut rest = raw.trim();
    let mut multiplier: i64 = 1;
    while let Some(last) = rest.chars().last() {
        let lower = last.to_ascii_lowercase();
        let Some(&(_, factor)) = MULTIPLIERS.iter().find(|(suffix, _)| *suffix == lower) else {
            break;
        };
        multiplier = multiplier.checked_mul(factor)?;
        rest = &rest[..rest.len() - last.len_utf8()];
    }
    Some((rest, multiplier))
}

pub struct BoolParser;

impl TypedParser for BoolParser {
    type Output = bool;

    fn parse(&self, raw: &str) -> Parsed<bool> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "on" | "1" => Parsed::Value(true),
            "false" | "no" | "n" | "off" | "0" => Parsed::Value(false),
            _ => Parsed::Failed(format!("'{raw}' is not true or false")),
        }
    }

    fn render(&self, value: &bool) -> String {
        value.to_string()
    }
}

pub struct StringParser;

impl TypedParser for StringParser {
    type Output = String;

    fn parse(&self, raw: &str) -> Parsed<String> {
        Parsed::Value(raw.to_string())
    }

    fn render(&self, value: &String) -> String {
        value.clone()
    }
}

/// Signed integer types with a built-in parser.
pub trait WholeNumber: Copy + Send + Sync + ToString + TryFrom<i64> + 'static {}

impl WholeNumber for i8 {}
impl WholeNumber for i16 {}
impl WholeNumber for i32 {}
impl WholeNumber for i64 {}

pub struct IntParser<T>(Marker<T>);

impl<T> IntParser<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for IntParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: WholeNumber> TypedParser for IntParser<T> {
    type Output = T;

    fn parse(&self, raw: &str) -> Parsed<T> {
        let Some((digits, multiplier)) = apply_multipliers(raw) else {
            return Parsed::Failed(format!("'{raw}' has too many magnitude suffixes"));
        };
        let Ok(base) = digits.parse::<i64>() else {
            return Parsed::Failed(format!("'{raw}' is not a whole number"));
        };
        let total = base
            .checked_mul(multiplier)
            .and_then(|total| T::try_from(total).ok());
        match total {
            Some(value) => Parsed::Value(value),
            None => Parsed::Failed(format!(
                "'{raw}' is out of range for {}",
                ValueType::of::<T>()
            )),
        }
    }

    fn render(&self, value: &T) -> String {
        value.to_string()
    }
}

/// Floating point types with a built-in parser.
pub trait Decimal: Copy + Send + Sync + ToString + 'static {
    /// Narrows `value`, rejecting anything that is not finite afterwards.
    fn from_f64(value: f64) -> Option<Self>;
}

impl Decimal for f32 {
    fn from_f64(value: f64) -> Option<Self> {
        let narrowed = value as f32;
        narrowed.is_finite().then_some(narrowed)
    }
}

impl Decimal for f64 {
    fn from_f64(value: f64) -> Option<Self> {
        value.is_finite().then_some(value)
    }
}

pub struct FloatParser<T>(Marker<T>);

impl<T> FloatParser<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FloatParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Decimal> TypedParser for FloatParser<T> {
    type Output = T;

    fn parse(&self, raw: &str) -> Parsed<T> {
        let Some((digits, multiplier)) = apply_multipliers(raw) else {
            return Parsed::Failed(format!("'{raw}' has too many magnitude suffixes"));
        };
        let Ok(base) = digits.parse::<f64>() else {
            return Parsed::Failed(format!("'{raw}' is not a number"));
        };
        match T::from_f64(base * multiplier as f64) {
            Some(value) => Parsed::Value(value),
            None => Parsed::Failed(format!(
                "'{raw}' is out of range for {}",
                ValueType::of::<T>()
            )),
        }
    }

    fn render(&self, value: &T) -> String {
        value.to_string()
    }
}
