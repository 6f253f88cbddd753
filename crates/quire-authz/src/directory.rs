//! Principal lookup seam.

use std::collections::HashMap;

use async_trait::async_trait;
use quire_core::{Group, Id, User};

use crate::error::AuthzError;

/// Read access to users and groups.
///
/// The aggregator walks hierarchies through this trait and never touches
/// storage itself. Implementors choose their own error type; it must absorb
/// [`AuthzError`] so walk failures surface through the same channel.
#[async_trait]
pub trait Directory: Send + Sync {
    type Error: From<AuthzError> + Send;

    async fn user(&self, id: &Id) -> Result<Option<User>, Self::Error>;

    async fn group(&self, id: &Id) -> Result<Option<Group>, Self::Error>;

    /// Every group listing `member` among its members.
    async fn groups_of(&self, member: &Id) -> Result<Vec<Group>, Self::Error>;
}

/// A directory over in-memory maps.
#[derive(Debug, Clone, Default)]
pub struct MapDirectory {
    users: HashMap<Id, User>,
    groups: HashMap<Id, Group>,
}

impl MapDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn insert_group(&mut self, group: Group) {
        self.groups.insert(group.id, group);
    }

    pub fn user_mut(&mut self, id: &Id) -> Option<&mut User> {
        self.users.get_mut(id)
    }

    pub fn group_mut(&mut self, id: &Id) -> Option<&mut Group> {
        self.groups.get_mut(id)
    }
}

#[async_trait]
impl Directory for MapDirectory {
    type Error = AuthzError;

    async fn user(&self, id: &Id) -> Result<Option<User>, AuthzError> {
        Ok(self.users.get(id).cloned())
    }

    async fn group(&self, id: &Id) -> Result<Option<Group>, AuthzError> {
        Ok(self.groups.get(id).cloned())
    }

    async fn groups_of(&self, member: &Id) -> Result<Vec<Group>, AuthzError> {
        let mut groups: Vec<Group> = self
            .groups
            .values()
            .filter(|g| g.has_member(member))
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }
}
