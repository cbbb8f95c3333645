use std::fmt::{Display, Formatter};

/// Handle to a node of a [`Bdd`](crate::bdd::Bdd) manager.
///
/// Slots `0` and `1` hold the shared terminals; every other handle points at
/// a decision node owned by exactly one diagram.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(u32);

impl Ref {
    /// The `FALSE` terminal (weight zero).
    pub const FALSE: Ref = Ref(0);
    /// The `TRUE` terminal (weight one).
    pub const TRUE: Ref = Ref(1);

    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the internal representation of the reference.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Return the storage index of the reference.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_false(self) -> bool {
        self.0 == Self::FALSE.0
    }

    pub const fn is_true(self) -> bool {
        self.0 == Self::TRUE.0
    }

    pub const fn is_terminal(self) -> bool {
        self.0 <= Self::TRUE.0
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::FALSE => write!(f, "@F"),
            Self::TRUE => write!(f, "@T"),
            Self(i) => write!(f, "@{}", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_terminals() {
        assert!(Ref::FALSE.is_false());
        assert!(Ref::TRUE.is_true());
        assert!(Ref::FALSE.is_terminal());
        assert!(!Ref::new(2).is_terminal());
        assert_eq!(Ref::new(7).to_string(), "@7");
        assert_eq!(Ref::TRUE.to_string(), "@T");
    }
}
