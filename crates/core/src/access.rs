//! Admin/operator access control shared by the treasury and governance
//! components.
//!
//! Each component owns one [`AccessControl`]: a single admin able to change
//! configuration, and a set of operators for day-to-day actions (pausing,
//! reward locking). The admin can rotate itself and manage the operator set.

use alloy::primitives::Address;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use tracing::info;

/// Access-control failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("only admin")]
    OnlyAdmin,
    #[error("only operator")]
    OnlyOperator,
    #[error("invalid admin")]
    InvalidAdmin,
}

/// Admin plus operator set for a single component.
#[derive(Debug)]
pub struct AccessControl {
    admin: RwLock<Address>,
    operators: RwLock<BTreeSet<Address>>,
}

impl AccessControl {
    pub fn new(admin: Address) -> Self {
        Self {
            admin: RwLock::new(admin),
            operators: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn admin(&self) -> Address {
        *self.admin.read()
    }

    pub fn is_operator(&self, who: Address) -> bool {
        self.operators.read().contains(&who)
    }

    /// Reject callers other than the admin.
    pub fn check_admin(&self, caller: Address) -> Result<(), AccessError> {
        if caller == *self.admin.read() {
            Ok(())
        } else {
            Err(AccessError::OnlyAdmin)
        }
    }

    /// Reject callers that are neither an operator nor the admin.
    pub fn check_operator(&self, caller: Address) -> Result<(), AccessError> {
        if self.is_operator(caller) || caller == *self.admin.read() {
            Ok(())
        } else {
            Err(AccessError::OnlyOperator)
        }
    }

    /// Hand the admin role to a new address. Zero is rejected.
    pub fn transfer_admin(&self, caller: Address, new_admin: Address) -> Result<(), AccessError> {
        self.check_admin(caller)?;
        if new_admin == Address::ZERO {
            return Err(AccessError::InvalidAdmin);
        }
        info!(old = %caller, new = %new_admin, "Admin transferred");
        *self.admin.write() = new_admin;
        Ok(())
    }

    /// Add an operator. Re-adding an existing operator is a no-op.
    pub fn add_operator(&self, caller: Address, operator: Address) -> Result<(), AccessError> {
        self.check_admin(caller)?;
        if self.operators.write().insert(operator) {
            info!(operator = %operator, "Operator added");
        }
        Ok(())
    }

    /// Remove an operator. Removing an absent operator is a no-op.
    pub fn remove_operator(&self, caller: Address, operator: Address) -> Result<(), AccessError> {
        self.check_admin(caller)?;
        if self.operators.write().remove(&operator) {
            info!(operator = %operator, "Operator removed");
        }
        Ok(())
    }

    pub fn operators(&self) -> Vec<Address> {
        self.operators.read().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const ADMIN: Address = address!("1000000000000000000000000000000000000001");
    const OPERATOR: Address = address!("1000000000000000000000000000000000000002");
    const OUTSIDER: Address = address!("1000000000000000000000000000000000000003");

    #[test]
    fn test_admin_gating() {
        let access = AccessControl::new(ADMIN);
        assert!(access.check_admin(ADMIN).is_ok());
        assert_eq!(access.check_admin(OUTSIDER), Err(AccessError::OnlyAdmin));
    }

    #[test]
    fn test_operator_gating() {
        let access = AccessControl::new(ADMIN);
        access.add_operator(ADMIN, OPERATOR).unwrap();

        assert!(access.check_operator(OPERATOR).is_ok());
        // the admin passes operator checks too
        assert!(access.check_operator(ADMIN).is_ok());
        assert_eq!(access.check_operator(OUTSIDER), Err(AccessError::OnlyOperator));

        access.remove_operator(ADMIN, OPERATOR).unwrap();
        assert_eq!(access.check_operator(OPERATOR), Err(AccessError::OnlyOperator));
    }

    #[test]
    fn test_operator_changes_are_admin_only() {
        let access = AccessControl::new(ADMIN);
        assert_eq!(
            access.add_operator(OUTSIDER, OPERATOR),
            Err(AccessError::OnlyAdmin)
        );
    }

    #[test]
    fn test_admin_transfer() {
        let access = AccessControl::new(ADMIN);
        assert_eq!(
            access.transfer_admin(ADMIN, Address::ZERO),
            Err(AccessError::InvalidAdmin)
        );

        access.transfer_admin(ADMIN, OUTSIDER).unwrap();
        assert!(access.check_admin(OUTSIDER).is_ok());
        assert_eq!(access.check_admin(ADMIN), Err(AccessError::OnlyAdmin));
    }
}
