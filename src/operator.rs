use std::fmt;

/// Binary operators for [`Bdd::apply`][crate::Bdd::apply].
///
/// Only the operators from [`BddOp::And`] to [`BddOp::Nor`] can be combined
/// with an existential quantification in [`Bdd::app_ex`][crate::Bdd::app_ex].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BddOp {
    /// Logical conjunction (truth table `0001`).
    And,
    /// Logical exclusive or (truth table `0110`).
    Xor,
    /// Logical disjunction (truth table `0111`).
    Or,
    /// Negated conjunction (truth table `1110`).
    Nand,
    /// Negated disjunction (truth table `1000`).
    Nor,
    /// Implication (truth table `1101`).
    Imp,
    /// Bi-implication (truth table `1001`).
    Biimp,
    /// Set difference (truth table `0010`).
    Diff,
    /// Less than (truth table `0100`).
    Less,
    /// Reverse implication (truth table `1011`).
    Invimp,
}

/// Cache discriminator for the unary negation, sharing the apply cache.
/// Must stay outside the range of the binary operator codes.
pub(crate) const OPCODE_NOT: usize = 10;

impl BddOp {
    /// The operator code used as cache discriminator.
    pub(crate) const fn opcode(self) -> usize {
        match self {
            Self::And => 0,
            Self::Xor => 1,
            Self::Or => 2,
            Self::Nand => 3,
            Self::Nor => 4,
            Self::Imp => 5,
            Self::Biimp => 6,
            Self::Diff => 7,
            Self::Less => 8,
            Self::Invimp => 9,
        }
    }

    /// The truth table of the operator, indexed by `left << 1 | right`.
    pub(crate) const fn truth_table(self) -> [usize; 4] {
        match self {
            Self::And => [0, 0, 0, 1],
            Self::Xor => [0, 1, 1, 0],
            Self::Or => [0, 1, 1, 1],
            Self::Nand => [1, 1, 1, 0],
            Self::Nor => [1, 0, 0, 0],
            Self::Imp => [1, 1, 0, 1],
            Self::Biimp => [1, 0, 0, 1],
            Self::Diff => [0, 0, 1, 0],
            Self::Less => [0, 1, 0, 0],
            Self::Invimp => [1, 0, 1, 1],
        }
    }

    /// Whether the operator may be combined with an existential
    /// quantification in `app_ex`.
    pub(crate) const fn supports_quantification(self) -> bool {
        matches!(self, Self::And | Self::Xor | Self::Or | Self::Nand | Self::Nor)
    }
}

impl fmt::Display for BddOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::And => "and",
            Self::Xor => "xor",
            Self::Or => "or",
            Self::Nand => "nand",
            Self::Nor => "nor",
            Self::Imp => "imp",
            Self::Biimp => "biimp",
            Self::Diff => "diff",
            Self::Less => "less",
            Self::Invimp => "invimp",
        };
        f.write_str(name)
    }
}
