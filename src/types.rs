//! Type-safe wrapper for literals.
//!
//! Variables are plain `u32` indices into the network. Literals encode
//! "variable = value" as a signed number whose sign carries polarity.

use std::fmt;
use std::ops::Neg;

/// Index of a network variable.
pub type Variable = u32;

/// Symbolic weight identifier attached to edges.
///
/// With determinism enabled, `0` stands for probability zero and `1` for
/// probability one. All other identifiers are numbered above the literals.
pub type WeightId = u32;

pub type Probability = f64;

/// A signed literal.
///
/// The magnitude indexes the flat literal table (`1..=L`) and the sign is the
/// polarity used during conditioning.
///
/// # Invariants
///
/// - Literal `0` is reserved and never produced by [`Literal::new`]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Literal(i32);

impl Literal {
    /// Creates a literal from its signed value.
    ///
    /// # Panics
    ///
    /// Panics if `value == 0`.
    pub fn new(value: i32) -> Self {
        assert_ne!(value, 0, "Literal 0 is reserved");
        Literal(value)
    }

    /// Positive literal with the given index.
    pub fn positive(index: u32) -> Self {
        Literal::new(index as i32)
    }

    /// Raw signed value.
    pub fn get(self) -> i32 {
        self.0
    }

    /// Index into the literal table.
    pub fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Same literal with positive polarity.
    pub fn abs(self) -> Self {
        Literal(self.0.abs())
    }
}

impl Neg for Literal {
    type Output = Literal;

    fn neg(self) -> Self::Output {
        Literal(-self.0)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Literal> for i32 {
    fn from(lit: Literal) -> Self {
        lit.0
    }
}
