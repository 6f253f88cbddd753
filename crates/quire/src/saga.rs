//! Commit as a compensating saga.
//!
//! Each step applies one action and records how to undo it. When a step
//! fails, the recorded undos run newest first. Blob removals cannot be
//! undone, so they are always the last steps of a commit.

use quire_core::StateKey;
use quire_store::Store;
use tracing::warn;

use crate::blob::BlobStore;
use crate::error::{EngineError, Result};

/// One committed action.
#[derive(Debug)]
pub(crate) enum Step {
    Put { key: StateKey, value: Vec<u8> },
    Delete { key: StateKey },
    RemoveBlob { bucket: String, key: String },
}

/// How to reverse an applied step.
enum Undo {
    Restore { key: StateKey, value: Vec<u8> },
    Remove { key: StateKey },
}

/// Apply `steps` in order, compensating on the first failure.
///
/// If every compensation succeeds the original error is returned as is;
/// otherwise it comes back wrapped in [`EngineError::Compensation`].
pub(crate) async fn run<S, B>(store: &S, blobs: &B, steps: Vec<Step>) -> Result<()>
where
    S: Store + ?Sized,
    B: BlobStore + ?Sized,
{
    let mut applied = Vec::with_capacity(steps.len());

    for step in steps {
        if let Err(cause) = apply(store, blobs, step, &mut applied).await {
            let failures = compensate(store, applied).await;
            if failures.is_empty() {
                return Err(cause);
            }
            return Err(EngineError::Compensation {
                cause: Box::new(cause),
                failures,
            });
        }
    }

    Ok(())
}

async fn apply<S, B>(store: &S, blobs: &B, step: Step, applied: &mut Vec<Undo>) -> Result<()>
where
    S: Store + ?Sized,
    B: BlobStore + ?Sized,
{
    match step {
        Step::Put { key, value } => {
            let prior = store.get(&key).await?;
            store.put(&key, value).await?;
            applied.push(match prior {
                Some(value) => Undo::Restore { key, value },
                None => Undo::Remove { key },
            });
        }
        Step::Delete { key } => {
            if let Some(value) = store.get(&key).await? {
                store.delete(&key).await?;
                applied.push(Undo::Restore { key, value });
            }
        }
        Step::RemoveBlob { bucket, key } => {
            blobs.remove_object(&bucket, &key).await?;
        }
    }
    Ok(())
}

async fn compensate<S: Store + ?Sized>(store: &S, applied: Vec<Undo>) -> Vec<String> {
    let mut failures = Vec::new();

    for undo in applied.into_iter().rev() {
        let (key, result) = match undo {
            Undo::Restore { key, value } => {
                let result = store.put(&key, value).await;
                (key, result)
            }
            Undo::Remove { key } => {
                let result = store.delete(&key).await;
                (key, result)
            }
        };
        if let Err(e) = result {
            warn!(key = ?key, error = %e, "compensation step failed");
            failures.push(format!("{:?}: {}", key, e));
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use async_trait::async_trait;
    use quire_core::RecordKind;
    use quire_store::{MemoryStore, Page, Selector, StoreError};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Fails puts of one record kind; optionally fails every delete.
    struct FlakyStore {
        inner: MemoryStore,
        fail_put: RecordKind,
        fail_deletes: AtomicBool,
    }

    impl FlakyStore {
        fn new(fail_put: RecordKind) -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_put,
                fail_deletes: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn get(&self, key: &StateKey) -> quire_store::Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &StateKey, value: Vec<u8>) -> quire_store::Result<()> {
            if key.kind() == self.fail_put {
                return Err(StoreError::InvalidData("injected put failure".into()));
            }
            self.inner.put(key, value).await
        }

        async fn delete(&self, key: &StateKey) -> quire_store::Result<()> {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(StoreError::InvalidData("injected delete failure".into()));
            }
            self.inner.delete(key).await
        }

        async fn scan_prefix(
            &self,
            prefix: &StateKey,
            page_size: usize,
            token: Option<&str>,
        ) -> quire_store::Result<Page> {
            self.inner.scan_prefix(prefix, page_size, token).await
        }

        async fn rich_query(
            &self,
            selector: &Selector,
            page_size: usize,
            token: Option<&str>,
        ) -> quire_store::Result<Page> {
            self.inner.rich_query(selector, page_size, token).await
        }
    }

    fn bucket(name: &str) -> StateKey {
        StateKey::bucket(name).unwrap()
    }

    #[tokio::test]
    async fn test_all_steps_apply() {
        let store = MemoryStore::new();
        let blobs = MemoryBlobStore::new();
        store.put(&bucket("old"), vec![1]).await.unwrap();

        let steps = vec![
            Step::Put { key: bucket("new"), value: vec![2] },
            Step::Delete { key: bucket("old") },
            Step::RemoveBlob { bucket: "b".into(), key: "k".into() },
        ];
        run(&store, &blobs, steps).await.unwrap();

        assert_eq!(store.get(&bucket("new")).await.unwrap(), Some(vec![2]));
        assert!(store.get(&bucket("old")).await.unwrap().is_none());
        assert_eq!(blobs.removed().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_step_restores_prior_state() {
        let store = FlakyStore::new(RecordKind::User);
        let blobs = MemoryBlobStore::new();
        store.inner.put(&bucket("kept"), vec![1]).await.unwrap();
        store.inner.put(&bucket("gone"), vec![9]).await.unwrap();

        let user = StateKey::user(&quire_core::Id::from_bytes([1; 32]));
        let steps = vec![
            Step::Put { key: bucket("kept"), value: vec![2] },
            Step::Put { key: bucket("fresh"), value: vec![3] },
            Step::Delete { key: bucket("gone") },
            Step::Put { key: user, value: vec![4] },
        ];
        let err = run(&store, &blobs, steps).await.unwrap_err();

        assert!(matches!(err, EngineError::Store(_)));
        assert_eq!(store.get(&bucket("kept")).await.unwrap(), Some(vec![1]));
        assert!(store.get(&bucket("fresh")).await.unwrap().is_none());
        assert_eq!(store.get(&bucket("gone")).await.unwrap(), Some(vec![9]));
    }

    #[tokio::test]
    async fn test_blob_failure_rolls_back_state() {
        let store = MemoryStore::new();
        let blobs = MemoryBlobStore::new();
        blobs.fail_removals(true);
        store.put(&bucket("obj"), vec![1]).await.unwrap();

        let steps = vec![
            Step::Delete { key: bucket("obj") },
            Step::RemoveBlob { bucket: "b".into(), key: "k".into() },
        ];
        let err = run(&store, &blobs, steps).await.unwrap_err();

        assert!(matches!(err, EngineError::Blob(_)));
        assert_eq!(store.get(&bucket("obj")).await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn test_failed_compensation_is_reported() {
        let store = FlakyStore::new(RecordKind::User);
        store.fail_deletes.store(true, Ordering::SeqCst);
        let blobs = MemoryBlobStore::new();

        let user = StateKey::user(&quire_core::Id::from_bytes([1; 32]));
        let steps = vec![
            Step::Put { key: bucket("fresh"), value: vec![3] },
            Step::Put { key: user, value: vec![4] },
        ];
        let err = run(&store, &blobs, steps).await.unwrap_err();

        match err {
            EngineError::Compensation { cause, failures } => {
                assert!(matches!(*cause, EngineError::Store(_)));
                assert_eq!(failures.len(), 1);
            }
            other => panic!("expected compensation error, got {:?}", other),
        }
    }
}
