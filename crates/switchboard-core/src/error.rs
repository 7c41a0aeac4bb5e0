use thiserror::Error;

use crate::checkout::CheckoutStep;
use crate::needs::PillKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("unknown pill key: {0}")]
    UnknownKey(String),

    #[error("option {value:?} is not valid for pill {key}")]
    UnknownOption { key: PillKey, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("payment details are incomplete: {0}")]
    Incomplete(String),

    #[error("cannot {action} from {from}")]
    InvalidTransition {
        action: &'static str,
        from: CheckoutStep,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
