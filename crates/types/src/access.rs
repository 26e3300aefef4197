//! Caller capability checks.

use alloy_primitives::Address;
use thiserror::Error;

/// Authorization failure at a component entry point.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The caller is not the identity allowed to invoke this operation.
    #[error("caller {caller} is not permitted to call {operation}")]
    Unauthorized {
        /// The rejected caller
        caller: Address,
        /// Name of the guarded operation
        operation: &'static str,
    },
}

/// Fails unless `caller == allowed`.
pub fn ensure_caller(
    caller: Address,
    allowed: Address,
    operation: &'static str,
) -> Result<(), AccessError> {
    ensure_any_caller(caller, &[allowed], operation)
}

/// Fails unless `caller` is one of `allowed`.
pub fn ensure_any_caller(
    caller: Address,
    allowed: &[Address],
    operation: &'static str,
) -> Result<(), AccessError> {
    if allowed.contains(&caller) {
        Ok(())
    } else {
        Err(AccessError::Unauthorized { caller, operation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{GOVERNANCE_ADDR, SYSTEM_CALLER};

    #[test]
    fn test_any_caller() {
        let allowed = [SYSTEM_CALLER, GOVERNANCE_ADDR];
        assert!(ensure_any_caller(GOVERNANCE_ADDR, &allowed, "finish").is_ok());

        let stranger = Address::repeat_byte(9);
        let err = ensure_any_caller(stranger, &allowed, "finish").unwrap_err();
        assert_eq!(
            err,
            AccessError::Unauthorized {
                caller: stranger,
                operation: "finish"
            }
        );
    }
}
