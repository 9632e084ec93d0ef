//! In-process store with a simulated biometric gate and fault injection.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::{EncryptedStorage, StorageError};

/// How the simulated biometric gate answers an authenticated request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BiometricBehavior {
    /// The user authenticates successfully.
    #[default]
    Allow,
    /// The user dismisses the prompt.
    Cancel,
    /// No hardware, not enrolled, or locked out.
    Unavailable,
}

/// Injected outcome for writes to a chosen key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteFailure {
    /// `set_item` returns `Ok(false)`.
    Rejected,
    /// `set_item` returns a backend error.
    Error,
}

struct Item {
    value: Zeroizing<String>,
    protected: bool,
}

#[derive(Default)]
struct State {
    items: HashMap<String, Item>,
    biometric: BiometricBehavior,
    write_failures: HashMap<String, WriteFailure>,
    removal_failures: HashSet<String>,
    prompts: Vec<String>,
}

/// Thread-safe in-memory [`EncryptedStorage`].
///
/// Clones share the same contents, so a test can hand one clone to a vault
/// and inspect the other.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<State>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::Backend("memory storage lock poisoned".into()))
    }

    /// Set how authenticated requests are answered from now on.
    pub fn set_biometric_behavior(&self, behavior: BiometricBehavior) {
        if let Ok(mut state) = self.state() {
            state.biometric = behavior;
        }
    }

    /// Make every write to `key` fail with `failure`.
    pub fn fail_writes_to(&self, key: &str, failure: WriteFailure) {
        if let Ok(mut state) = self.state() {
            state.write_failures.insert(key.to_owned(), failure);
        }
    }

    /// Make every removal of `key` fail.
    pub fn fail_removal_of(&self, key: &str) {
        if let Ok(mut state) = self.state() {
            state.removal_failures.insert(key.to_owned());
        }
    }

    /// Clear all injected failures.
    pub fn clear_failures(&self) {
        if let Ok(mut state) = self.state() {
            state.write_failures.clear();
            state.removal_failures.clear();
        }
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state()
            .map(|state| state.items.contains_key(key))
            .unwrap_or(false)
    }

    /// Whether `key` is stored behind the authentication gate.
    #[must_use]
    pub fn is_protected(&self, key: &str) -> bool {
        self.state()
            .map(|state| state.items.get(key).is_some_and(|item| item.protected))
            .unwrap_or(false)
    }

    /// Raw stored value, bypassing the gate.
    #[must_use]
    pub fn raw_value(&self, key: &str) -> Option<String> {
        self.state()
            .ok()
            .and_then(|state| state.items.get(key).map(|item| item.value.to_string()))
    }

    /// Overwrite a stored value in place, keeping its protection flag.
    pub fn tamper(&self, key: &str, value: &str) {
        if let Ok(mut state) = self.state() {
            if let Some(item) = state.items.get_mut(key) {
                item.value = Zeroizing::new(value.to_owned());
            }
        }
    }

    /// Sorted list of stored keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .state()
            .map(|state| state.items.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Prompt texts shown so far, oldest first.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.state()
            .map(|state| state.prompts.clone())
            .unwrap_or_default()
    }
}

fn authenticate(state: &mut State, prompt: &str) -> Result<(), StorageError> {
    state.prompts.push(prompt.to_owned());
    match state.biometric {
        BiometricBehavior::Allow => Ok(()),
        BiometricBehavior::Cancel => Err(StorageError::BiometricCancelled),
        BiometricBehavior::Unavailable => Err(StorageError::BiometricUnavailable(
            "no biometric hardware enrolled".into(),
        )),
    }
}

#[async_trait]
impl EncryptedStorage for MemoryStorage {
    async fn get_item(
        &self,
        key: &str,
        auth_prompt: Option<&str>,
    ) -> Result<Option<String>, StorageError> {
        let mut state = self.state()?;
        let protected = match state.items.get(key) {
            None => return Ok(None),
            Some(item) => item.protected,
        };
        match (protected, auth_prompt) {
            (true, None) => {
                return Err(StorageError::Backend(format!(
                    "item '{key}' requires user authentication"
                )))
            }
            (_, Some(prompt)) => authenticate(&mut state, prompt)?,
            (false, None) => {}
        }
        Ok(state.items.get(key).map(|item| item.value.to_string()))
    }

    async fn set_item(
        &self,
        key: &str,
        value: &str,
        auth_prompt: Option<&str>,
    ) -> Result<bool, StorageError> {
        let mut state = self.state()?;
        match state.write_failures.get(key) {
            Some(WriteFailure::Rejected) => return Ok(false),
            Some(WriteFailure::Error) => {
                return Err(StorageError::Backend(format!("write to '{key}' failed")))
            }
            None => {}
        }
        if let Some(prompt) = auth_prompt {
            state.prompts.push(prompt.to_owned());
            if state.biometric == BiometricBehavior::Unavailable {
                return Err(StorageError::BiometricUnavailable(
                    "no biometric hardware enrolled".into(),
                ));
            }
        }
        state.items.insert(
            key.to_owned(),
            Item {
                value: Zeroizing::new(value.to_owned()),
                protected: auth_prompt.is_some(),
            },
        );
        Ok(true)
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut state = self.state()?;
        if state.removal_failures.contains(key) {
            return Err(StorageError::Backend(format!("removal of '{key}' failed")));
        }
        state.items.remove(key);
        Ok(())
    }

    async fn has_item(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.state()?.items.contains_key(key))
    }
}
