//! Cart state machine.

use serde::{Deserialize, Serialize};

/// The state of a cart in its lifecycle.
///
/// ```text
/// Open ──checkout──► CheckedOut
/// ```
///
/// `CheckedOut` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CartStatus {
    /// Items can be updated; checkout is allowed once the cart has items.
    #[default]
    Open,

    /// The cart was checked out (terminal state).
    CheckedOut,
}

impl CartStatus {
    /// Returns true if items can be modified in this state.
    pub fn can_update_items(&self) -> bool {
        matches!(self, CartStatus::Open)
    }

    /// Returns true if the cart can be checked out in this state.
    pub fn can_checkout(&self) -> bool {
        matches!(self, CartStatus::Open)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CartStatus::CheckedOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Open => "Open",
            CartStatus::CheckedOut => "CheckedOut",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
