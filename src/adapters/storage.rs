//! In-memory key-value storage adapter.
//!
//! Implements [`StoragePort`], [`ConfigPort`] and [`ProfileStore`] on top
//! of a namespaced map of postcard blobs.  Used by the host simulator and
//! the tests; a flash-backed store implements the same three traits.
//!
//! - Config and profiles are validated before they are persisted.
//! - Namespace isolation: each subsystem uses its own namespace.

use std::cell::RefCell;
use std::collections::HashMap;

use log::{info, warn};

use crate::app::ports::{
    ConfigError, ConfigPort, ProfileStore, ProfileStoreError, StorageError, StoragePort,
};
use crate::config::{validate_config, ControllerConfig};
use crate::profile::Profile;

const CONFIG_NAMESPACE: &str = "reflow";
const CONFIG_KEY: &str = "ctrlcfg";
const PROFILE_NAMESPACE: &str = "profile";
const PROFILE_KEY: &str = "active";

/// Largest blob accepted by [`StoragePort::write`].
const MAX_BLOB_SIZE: usize = 4000;

#[derive(Debug, Default)]
pub struct MemoryStore {
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    fn get(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.store
            .borrow()
            .get(&Self::composite_key(namespace, key))
            .cloned()
    }

    fn put(&self, namespace: &str, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StorageError::Full);
        }
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data);
        Ok(())
    }
}

impl ConfigPort for MemoryStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        match self.get(CONFIG_NAMESPACE, CONFIG_KEY) {
            Some(bytes) => {
                let cfg: ControllerConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("MemoryStore: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            None => {
                info!("MemoryStore: no stored config, using defaults");
                Ok(ControllerConfig::default())
            }
        }
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.put(CONFIG_NAMESPACE, CONFIG_KEY, bytes)
            .map_err(|_| ConfigError::StorageFull)?;
        info!("MemoryStore: config saved");
        Ok(())
    }
}

impl ProfileStore for MemoryStore {
    fn load(&self) -> Result<Profile, ProfileStoreError> {
        let bytes = self
            .get(PROFILE_NAMESPACE, PROFILE_KEY)
            .ok_or(ProfileStoreError::NotFound)?;
        let profile: Profile = postcard::from_bytes(&bytes).map_err(|_| {
            warn!("MemoryStore: stored profile is corrupted");
            ProfileStoreError::Corrupted
        })?;
        info!("MemoryStore: loaded profile '{}'", profile.name);
        Ok(profile)
    }

    fn save(&self, profile: &Profile) -> Result<(), ProfileStoreError> {
        profile.validate()?;
        let bytes =
            postcard::to_allocvec(profile).map_err(|_| ProfileStoreError::Storage(StorageError::IoError))?;
        self.put(PROFILE_NAMESPACE, PROFILE_KEY, bytes)?;
        info!(
            "MemoryStore: saved profile '{}' ({} phases)",
            profile.name,
            profile.phases.len()
        );
        Ok(())
    }
}

impl StoragePort for MemoryStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.get(namespace, key).ok_or(StorageError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.put(namespace, key, data.to_vec())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store
            .borrow()
            .contains_key(&Self::composite_key(namespace, key))
    }
}
