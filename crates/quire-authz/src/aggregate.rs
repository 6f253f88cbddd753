//! Inherited permission computation.
//!
//! A principal holds full rights over itself. Each ancestor in its chain
//! gains the rights the chain of links grants for one bucket: the AND of
//! every link grant between the principal and that ancestor. The walk stops
//! at the first link that grants nothing.
//!
//! Groups follow the same rule along SubGroup links. A user may reach one
//! ancestor group along several paths; that ancestor keeps the largest
//! value seen.

use std::collections::HashSet;

use quire_core::perms::{link_grant, FULL};
use quire_core::{seed_map, AccessKind, AclSnapshot, Group, Id, PermissionMap, User};
use tracing::debug;

use crate::access::test_access;
use crate::directory::Directory;
use crate::error::AuthzError;

/// Walks user and group hierarchies through a [`Directory`].
pub struct Aggregator<'d, D: Directory + ?Sized> {
    dir: &'d D,
}

impl<'d, D: Directory + ?Sized> Aggregator<'d, D> {
    pub fn new(dir: &'d D) -> Self {
        Self { dir }
    }

    /// Rights each ancestor of `user` inherits over it for `bucket`.
    pub async fn user_inherited(
        &self,
        user: &User,
        bucket: &str,
    ) -> Result<PermissionMap, D::Error> {
        let mut map = seed_map(user.id);
        let mut effective = FULL;
        let mut child = user.id;
        let mut next = user.parent;

        while let Some(parent_id) = next {
            let parent = self
                .dir
                .user(&parent_id)
                .await?
                .ok_or(AuthzError::UnknownPrincipal(parent_id))?;

            let Some(link) = parent.sub_user(&child) else {
                debug!(parent = %parent.id, child = %child, "sub-user link missing; chain ends");
                break;
            };
            let Some(grant) = link_grant(&link.perms, bucket) else {
                break;
            };

            effective &= grant;
            if effective == 0 {
                break;
            }
            map.insert(parent.id, effective);

            child = parent.id;
            next = parent.parent;
        }

        Ok(map)
    }

    /// Rights each ancestor of `group` inherits over it for `bucket`.
    pub async fn group_inherited(
        &self,
        group: &Group,
        bucket: &str,
    ) -> Result<PermissionMap, D::Error> {
        let mut map = PermissionMap::new();
        self.walk_group(group, bucket, &mut map).await?;
        Ok(map)
    }

    /// Group rights reachable from every group `user` directly belongs to.
    pub async fn groups_for_user(
        &self,
        user: &User,
        bucket: &str,
    ) -> Result<PermissionMap, D::Error> {
        let mut map = PermissionMap::new();
        for group in self.dir.groups_of(&user.id).await? {
            self.walk_group(&group, bucket, &mut map).await?;
        }
        Ok(map)
    }

    async fn walk_group(
        &self,
        group: &Group,
        bucket: &str,
        map: &mut PermissionMap,
    ) -> Result<(), D::Error> {
        keep_max(map, group.id, FULL);

        let mut visited: HashSet<Id> = HashSet::from([group.id]);
        let mut effective = FULL;
        let mut child = group.id;
        let mut next = group.parent;

        while let Some(parent_id) = next {
            if !visited.insert(parent_id) {
                break;
            }
            let parent = self
                .dir
                .group(&parent_id)
                .await?
                .ok_or(AuthzError::UnknownGroup(parent_id))?;

            let Some(link) = parent.sub_group(&child) else {
                debug!(parent = %parent.id, child = %child, "subgroup link missing; chain ends");
                break;
            };
            let Some(grant) = link_grant(&link.perms, bucket) else {
                break;
            };

            effective &= grant;
            if effective == 0 {
                break;
            }
            keep_max(map, parent.id, effective);

            child = parent.id;
            next = parent.parent;
        }

        Ok(())
    }

    /// Whether `user` holds `access` on `bucket` under `acl`.
    pub async fn check(
        &self,
        acl: &AclSnapshot,
        user: &User,
        bucket: &str,
        access: AccessKind,
    ) -> Result<bool, D::Error> {
        let users = self.user_inherited(user, bucket).await?;
        let groups = self.groups_for_user(user, bucket).await?;
        Ok(test_access(acl, &users, &groups, access))
    }
}

fn keep_max(map: &mut PermissionMap, id: Id, bits: u32) {
    let slot = map.entry(id).or_insert(0);
    *slot = (*slot).max(bits);
}
