use serde::Serialize;

use super::domain::{BranchId, Principal, Role, EXEMPT_BRANCH_NAME};

/// Visibility predicate applied to every scoped store query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "branch_id", rename_all = "snake_case")]
pub enum Scope {
    Unrestricted,
    /// Only records owned (directly or through a citizen) by users of the branch.
    RestrictedToBranch(BranchId),
}

impl Scope {
    /// A manager is restricted to their own branch unless that branch is the
    /// exempt head office. Every other role sees unrestricted data.
    pub fn resolve(principal: &Principal) -> Self {
        match (principal.role, principal.branch.as_ref()) {
            (Role::Manager, Some(branch)) if branch.name != EXEMPT_BRANCH_NAME => {
                Self::RestrictedToBranch(branch.id)
            }
            _ => Self::Unrestricted,
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, Self::RestrictedToBranch(_))
    }

    /// Whether a record owned through a user of `branch` is visible.
    pub fn admits(&self, branch: Option<BranchId>) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::RestrictedToBranch(id) => branch == Some(*id),
        }
    }
}
