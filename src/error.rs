use std::fmt;

/// Error raised by the BDD engine.
///
/// The engine keeps the first error it encounters in a sticky per-engine
/// state (see [`Bdd::error`][crate::Bdd::error]); every variant carries the
/// rendered message of its cause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BddError {
    /// The node table is exhausted and cannot grow any further.
    Memory(String),
    /// An operand was not a valid node of this engine.
    Operand(String),
    /// The engine or a replacer was constructed with invalid parameters.
    Config(String),
    /// An internal invariant was violated, e.g. a renaming produced a
    /// duplicate level along one path.
    Internal(String),
    /// An enumeration callback asked to abort.
    Canceled(String),
}

impl BddError {
    /// The same error with the rendered earlier failure attached, keeping
    /// the first message at the tail of the chain.
    pub(crate) fn with_context(&self, prior: &str) -> Self {
        let chain = |msg: &str| format!("{msg}; prior: {prior}");
        match self {
            Self::Memory(msg) => Self::Memory(chain(msg)),
            Self::Operand(msg) => Self::Operand(chain(msg)),
            Self::Config(msg) => Self::Config(chain(msg)),
            Self::Internal(msg) => Self::Internal(chain(msg)),
            Self::Canceled(msg) => Self::Canceled(chain(msg)),
        }
    }
}

impl fmt::Display for BddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(msg) => write!(f, "out of memory: {msg}"),
            Self::Operand(msg) => write!(f, "invalid operand: {msg}"),
            Self::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::Canceled(msg) => write!(f, "canceled: {msg}"),
        }
    }
}

impl std::error::Error for BddError {}

#[cfg(test)]
mod tests {
    use super::BddError;

    #[test]
    fn test_display() {
        let err = BddError::Operand("node 17 points to a free slot".to_string());
        assert_eq!(err.to_string(), "invalid operand: node 17 points to a free slot");
        let err = BddError::Memory("cannot grow node table past 251 nodes".to_string());
        assert_eq!(err.to_string(), "out of memory: cannot grow node table past 251 nodes");
    }
}
