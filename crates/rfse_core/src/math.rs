//! Fixed-point quantity type for deterministic simulation.
//!
//! Every resource amount and power figure in the engine is a [`Quantity`].
//! Quantities are fixed-point numbers so that a run is bit-for-bit
//! reproducible on every platform. Floating-point values only appear at the
//! serialization boundary, where they are converted exactly once.
//!
//! All arithmetic saturates at the fixed-point range. No quantity operation
//! panics or wraps.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use fixed::types::I32F32;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed-point number type underlying all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Simulation day index. Day 0 is the first simulated day.
pub type Day = u32;

/// An amount of a resource (or of power, in kW).
///
/// Serializes as a decimal number in human-readable formats so catalog and
/// scenario files stay editable, and as raw fixed-point bits in binary
/// formats so archived results round-trip exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(pub Fixed);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Self = Self(Fixed::ZERO);

    /// Create a quantity from a whole number.
    #[must_use]
    pub fn new(amount: i32) -> Self {
        Self(Fixed::from_num(amount))
    }

    /// Create a quantity from a decimal value.
    ///
    /// Only used at load time. Values outside the fixed-point range saturate.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self(Fixed::saturating_from_num(value))
    }

    /// Convert to `f64` for display and serialization.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0.to_num::<f64>()
    }

    /// Whether this quantity is exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == Fixed::ZERO
    }

    /// Whether this quantity is below zero.
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.0 < Fixed::ZERO
    }

    /// Scale by a unit multiplier (or a day count).
    #[must_use]
    pub fn scaled(self, factor: u32) -> Self {
        Self(self.0.saturating_mul(Fixed::saturating_from_num(factor)))
    }

    /// Saturating addition.
    #[must_use]
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Check `self <= percent% of whole` without rounding.
    ///
    /// Compares `self * 100 <= whole * percent` on the raw bits in `i128`,
    /// so boundary values such as exactly 10% classify exactly across the
    /// whole quantity range.
    #[must_use]
    pub fn at_most_percent_of(self, whole: Self, percent: u32) -> bool {
        let lhs = i128::from(self.0.to_bits()) * 100;
        let rhs = i128::from(whole.0.to_bits()) * i128::from(percent);
        lhs <= rhs
    }

    /// Smallest whole number of units of `per_unit` that covers `self`.
    ///
    /// Returns 0 when `self` is not positive or `per_unit` is zero.
    #[must_use]
    pub fn units_to_cover(self, per_unit: Self) -> u32 {
        if self.0 <= Fixed::ZERO || per_unit.0 <= Fixed::ZERO {
            return 0;
        }
        let units = (self.0 / per_unit.0).ceil();
        units.saturating_to_num::<u32>()
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.saturating_add(rhs);
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.saturating_sub(rhs);
    }
}

impl Neg for Quantity {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0.saturating_neg())
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl From<i32> for Quantity {
    fn from(amount: i32) -> Self {
        Self::new(amount)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Quantity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_f64(self.to_f64())
        } else {
            serializer.serialize_i64(self.0.to_bits())
        }
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            deserializer.deserialize_f64(QuantityVisitor)
        } else {
            i64::deserialize(deserializer).map(|bits| Quantity(Fixed::from_bits(bits)))
        }
    }
}

struct QuantityVisitor;

impl Visitor<'_> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal quantity")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Quantity, E> {
        if value.is_finite() {
            Ok(Quantity::from_f64(value))
        } else {
            Err(E::custom(format!("quantity must be finite, got {value}")))
        }
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Quantity, E> {
        Ok(Quantity(Fixed::saturating_from_num(value)))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Quantity, E> {
        Ok(Quantity(Fixed::saturating_from_num(value)))
    }
}
