//! The ACL access predicate.

use quire_core::{AccessKind, AclSnapshot, EntryKind, PermissionMap};

/// Whether any entry of `acl` grants `access` to the holder of the maps.
///
/// An entry counts only if its own bits contain the access bit. A user entry
/// then matches when the inherited user map holds that bit for the entry's
/// ID; a group entry likewise against the group map. There are no deny
/// entries, so the first match decides.
pub fn test_access(
    acl: &AclSnapshot,
    users: &PermissionMap,
    groups: &PermissionMap,
    access: AccessKind,
) -> bool {
    let bit = access.bit();
    acl.iter().filter(|entry| entry.bits & bit != 0).any(|entry| {
        let map = match entry.kind {
            EntryKind::User => users,
            EntryKind::Group => groups,
        };
        map.get(&entry.id)
            .is_some_and(|held| held & entry.bits & bit != 0)
    })
}
