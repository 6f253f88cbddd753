//! Test fixtures for common scenarios.

use quire::{Engine, EngineConfig, MemoryBlobStore};
use quire_core::{KeyCredential, Keypair, User, UID_ATTRIBUTE};
use quire_store::MemoryStore;

/// Issuer stamped on every fixture credential.
pub const ISSUER: &str = "org1";

/// An engine over in-memory ledger and blob storage.
pub type TestEngine = Engine<MemoryStore, MemoryBlobStore>;

/// A credential presenting `name` as its uid attribute.
///
/// The signing key is seeded from the name, so the same name always yields
/// the same credential.
pub fn credential(name: &str) -> KeyCredential {
    let mut seed = [0u8; 32];
    for (slot, byte) in seed.iter_mut().zip(name.bytes().cycle()) {
        *slot = byte;
    }
    KeyCredential::new(ISSUER, &Keypair::from_seed(&seed)).with_attribute(UID_ATTRIBUTE, name)
}

/// Credentials for `count` distinct callers named `party0`, `party1`, ...
pub fn multi_party_credentials(count: usize) -> Vec<KeyCredential> {
    (0..count)
        .map(|i| credential(&format!("party{}", i)))
        .collect()
}

/// A ledger initialized by an `admin` caller holding every system right.
pub struct TestFixture {
    pub engine: TestEngine,
    pub admin: KeyCredential,
    pub root: User,
}

impl TestFixture {
    /// Create a fixture with the default engine configuration.
    pub async fn new() -> quire::Result<Self> {
        Self::with_config(EngineConfig::default()).await
    }

    pub async fn with_config(config: EngineConfig) -> quire::Result<Self> {
        let engine = Engine::new(MemoryStore::new(), MemoryBlobStore::new(), config);
        let admin = credential("admin");
        let root = engine.init_ledger(&admin).await?;
        Ok(Self {
            engine,
            admin,
            root,
        })
    }

    /// A fixture whose admin signs with a freshly generated key.
    pub async fn random() -> quire::Result<Self> {
        let seed: [u8; 32] = rand::random();
        let engine = Engine::new(
            MemoryStore::new(),
            MemoryBlobStore::new(),
            EngineConfig::default(),
        );
        let admin = KeyCredential::new(ISSUER, &Keypair::from_seed(&seed))
            .with_attribute(UID_ATTRIBUTE, "admin");
        let root = engine.init_ledger(&admin).await?;
        Ok(Self {
            engine,
            admin,
            root,
        })
    }

    /// Full uid of a fixture caller.
    pub fn uid(&self, name: &str) -> String {
        format!("{}##{}", ISSUER, name)
    }

    pub fn cred(&self, name: &str) -> KeyCredential {
        credential(name)
    }

    /// Register a root-level user through the admin and return its credential.
    pub async fn user(&self, name: &str, sys_perms: u32) -> quire::Result<KeyCredential> {
        self.engine
            .add_user(&self.admin, &self.uid(name), sys_perms)
            .await?;
        Ok(credential(name))
    }
}
