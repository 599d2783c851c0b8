//! Replay access policy
//!
//! The catalog itself never enforces access; it only records who took part
//! in each round. Download front-ends use [`AccessPolicy`] to decide whether a
//! requester may fetch a replay: participants always can, and so can anyone
//! holding one of the administrative roles.

use crate::traits::ReplayEntry;
use uuid::Uuid;

/// Roles that can access every replay by default
pub const DEFAULT_ADMIN_ROLES: &[&str] = &["Game Master", "Project Manager"];

/// Participant-or-admin access rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    admin_roles: Vec<String>,
}

impl AccessPolicy {
    /// Create a policy with a custom admin allow-list
    pub fn new(admin_roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            admin_roles: admin_roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Roles granting access to every replay
    pub fn admin_roles(&self) -> &[String] {
        &self.admin_roles
    }

    /// Whether any of the given roles is on the admin allow-list
    pub fn is_admin<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles
            .iter()
            .any(|role| self.admin_roles.iter().any(|admin| admin == role.as_ref()))
    }

    /// Whether a requester may access a replay
    pub fn can_access<S: AsRef<str>>(&self, entry: &ReplayEntry, requester: &Uuid, roles: &[S]) -> bool {
        entry.has_participant(requester) || self.is_admin(roles)
    }

    /// Keep only the replays a requester may access
    pub fn visible<'a, S: AsRef<str>>(
        &self,
        entries: &'a [ReplayEntry],
        requester: &Uuid,
        roles: &[S],
    ) -> Vec<&'a ReplayEntry> {
        let admin = self.is_admin(roles);
        entries
            .iter()
            .filter(|entry| admin || entry.has_participant(requester))
            .collect()
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_ROLES.iter().copied())
    }
}
