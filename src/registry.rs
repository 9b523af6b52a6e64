//! Provider registry: configured adapters keyed by id, with one designated master.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::client::Provider;
use crate::domain::{ProviderId, ProviderProfile, Role};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no providers configured")]
    Empty,

    #[error("provider `{id}` is configured more than once")]
    DuplicateId { id: ProviderId },

    #[error("providers `{first}` and `{second}` are both flagged master")]
    MultipleMasters { first: ProviderId, second: ProviderId },

    #[error("provider not found: {id}")]
    NotFound { id: String },
}

struct Entry {
    profile: ProviderProfile,
    provider: Arc<dyn Provider>,
}

/// Set of configured providers.
///
/// Ids and adapters are fixed at construction. The only mutable state is which entry is
/// master; it is a single index behind a lock, so every reader sees exactly one master and
/// roles are derived from that index rather than stored per profile.
pub struct ProviderRegistry {
    entries: Vec<Entry>,
    index: HashMap<ProviderId, usize>,
    master: RwLock<usize>,
}

impl ProviderRegistry {
    /// Register providers in the given order.
    ///
    /// At most one profile may be flagged [`Role::Master`]; when none is, the first one
    /// becomes master.
    pub fn new(
        providers: Vec<(ProviderProfile, Arc<dyn Provider>)>,
    ) -> Result<Self, RegistryError> {
        if providers.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut entries = Vec::with_capacity(providers.len());
        let mut index = HashMap::with_capacity(providers.len());
        let mut master: Option<usize> = None;

        for (position, (profile, provider)) in providers.into_iter().enumerate() {
            if index.insert(profile.id.clone(), position).is_some() {
                return Err(RegistryError::DuplicateId { id: profile.id });
            }
            if profile.is_master() {
                if let Some(first) = master {
                    let first: &Entry = &entries[first];
                    return Err(RegistryError::MultipleMasters {
                        first: first.profile.id.clone(),
                        second: profile.id,
                    });
                }
                master = Some(position);
            }
            entries.push(Entry { profile, provider });
        }

        let master = master.unwrap_or_else(|| {
            warn!(
                provider = %entries[0].profile.id,
                "no provider flagged master; defaulting to the first one"
            );
            0
        });

        Ok(Self {
            entries,
            index,
            master: RwLock::new(master),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, id: &str) -> Result<Arc<dyn Provider>, RegistryError> {
        self.position(id)
            .map(|position| self.entries[position].provider.clone())
    }

    pub fn master(&self) -> Arc<dyn Provider> {
        self.entries[self.master_position()].provider.clone()
    }

    pub fn master_id(&self) -> ProviderId {
        self.entries[self.master_position()].profile.id.clone()
    }

    /// Make `id` the master and every other provider a backup.
    ///
    /// An unknown id leaves the current assignment untouched.
    pub fn switch_master_to(&self, id: &str) -> Result<(), RegistryError> {
        let position = self.position(id)?;
        let previous = {
            let mut master = self.master.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *master, position)
        };

        if previous != position {
            info!(
                from = %self.entries[previous].profile.id,
                to = %self.entries[position].profile.id,
                "master provider switched"
            );
        }
        Ok(())
    }

    /// Snapshot of one profile with its current role.
    pub fn profile(&self, id: &str) -> Result<ProviderProfile, RegistryError> {
        let position = self.position(id)?;
        Ok(self.profile_at(position, self.master_position()))
    }

    /// Snapshot of all profiles in registration order, taken under a single lock read.
    pub fn profiles(&self) -> Vec<ProviderProfile> {
        let master = self.master_position();
        (0..self.entries.len())
            .map(|position| self.profile_at(position, master))
            .collect()
    }

    /// Providers in registration order.
    pub fn providers(&self) -> impl Iterator<Item = (&ProviderId, &Arc<dyn Provider>)> {
        self.entries
            .iter()
            .map(|entry| (&entry.profile.id, &entry.provider))
    }

    fn position(&self, id: &str) -> Result<usize, RegistryError> {
        ProviderId::new(id)
            .ok()
            .and_then(|id| self.index.get(&id).copied())
            .ok_or_else(|| RegistryError::NotFound { id: id.to_owned() })
    }

    fn master_position(&self) -> usize {
        *self.master.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn profile_at(&self, position: usize, master: usize) -> ProviderProfile {
        let mut profile = self.entries[position].profile.clone();
        profile.role = if position == master {
            Role::Master
        } else {
            Role::Backup
        };
        profile
    }
}
