//! Route permission checks.

use dashmap::DashSet;

/// Decides whether a route's permission requirement is met.
pub trait PermissionChecker: Send + Sync {
    fn is_granted(&self, permission: &str) -> bool;
}

/// Grants everything. Used when no checker is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn is_granted(&self, _permission: &str) -> bool {
        true
    }
}

/// A mutable set of granted permissions.
#[derive(Debug, Default)]
pub struct StaticPermissions {
    granted: DashSet<String>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, permission: impl Into<String>) -> Self {
        self.grant(permission);
        self
    }

    /// Grant `permission` at runtime.
    pub fn grant(&self, permission: impl Into<String>) {
        self.granted.insert(permission.into());
    }

    /// Returns false if the permission was not granted.
    pub fn revoke(&self, permission: &str) -> bool {
        self.granted.remove(permission).is_some()
    }
}

impl PermissionChecker for StaticPermissions {
    fn is_granted(&self, permission: &str) -> bool {
        self.granted.contains(permission)
    }
}

impl<F> PermissionChecker for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_granted(&self, permission: &str) -> bool {
        self(permission)
    }
}
