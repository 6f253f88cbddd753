//! Inherited permission maps, exposed for inspection.

use quire_authz::Aggregator;
use quire_core::{Credential, PermissionMap};
use quire_store::Store;

use crate::blob::BlobStore;
use crate::engine::Engine;
use crate::error::Result;

impl<S: Store, B: BlobStore> Engine<S, B> {
    /// What the caller's ancestors inherit over the caller on `bucket`.
    pub async fn gather_my_inherited_perms(
        &self,
        credential: &dyn Credential,
        bucket: &str,
    ) -> Result<PermissionMap> {
        let txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        Aggregator::new(&txn).user_inherited(&me, bucket).await
    }

    pub async fn gather_user_inherited_perms(
        &self,
        uid: &str,
        bucket: &str,
    ) -> Result<PermissionMap> {
        let txn = self.begin();
        let user = self.load_user(&txn, uid).await?;
        Aggregator::new(&txn).user_inherited(&user, bucket).await
    }

    pub async fn gather_group_inherited_perms(
        &self,
        name: &str,
        bucket: &str,
    ) -> Result<PermissionMap> {
        let txn = self.begin();
        let group = self.load_group(&txn, name).await?;
        Aggregator::new(&txn).group_inherited(&group, bucket).await
    }

    /// Group rights reachable from every group `uid` belongs to.
    pub async fn gather_group_perms_for_user(
        &self,
        uid: &str,
        bucket: &str,
    ) -> Result<PermissionMap> {
        let txn = self.begin();
        let user = self.load_user(&txn, uid).await?;
        Aggregator::new(&txn).groups_for_user(&user, bucket).await
    }
}
