use crate::reference::Ref;
use crate::types::{Literal, WeightId};
use crate::utils::{pairing3, MyHash};

/// Literal stored in the `FALSE` terminal.
pub const FALSE_LITERAL: i32 = 0;
/// Literal stored in the `TRUE` terminal.
pub const TRUE_LITERAL: i32 = -1;

/// Multiset of weight identifiers on a then-edge, kept sorted.
pub type Weights = Vec<WeightId>;

/// A decision node of a weighted BDD.
///
/// `weights` annotate the high (then) edge: following `high` multiplies the
/// accumulated weight by every identifier in the set.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Node {
    pub literal: i32,
    pub high: Ref,
    pub low: Ref,
    pub weights: Weights,
    /// Number of parents (plus external holders) pointing here.
    pub refs: u32,
}

impl Node {
    pub fn new(literal: Literal, high: Ref, low: Ref, weights: Weights) -> Self {
        debug_assert!(weights.windows(2).all(|w| w[0] <= w[1]), "Weights must be sorted");
        Self {
            literal: literal.get(),
            high,
            low,
            weights,
            refs: 0,
        }
    }

    pub(crate) fn terminal(literal: i32) -> Self {
        Self {
            literal,
            high: Ref::FALSE,
            low: Ref::FALSE,
            weights: Weights::new(),
            refs: u32::MAX,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.literal == FALSE_LITERAL || self.literal == TRUE_LITERAL
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            literal: self.literal,
            high: self.high,
            low: self.low,
            weights: self.weights.clone(),
        }
    }
}

/// Structural identity of a node, used for hash-consing.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct NodeKey {
    pub literal: i32,
    pub high: Ref,
    pub low: Ref,
    pub weights: Weights,
}

impl MyHash for NodeKey {
    fn hash(&self) -> u64 {
        pairing3(
            pairing3(self.literal as u32 as u64, self.high.get() as u64, self.low.get() as u64),
            self.weights.hash(),
            self.weights.len() as u64,
        )
    }
}

/// Merge two sorted weight multisets.
pub fn merge_weights(a: &[WeightId], b: &[WeightId]) -> Weights {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
