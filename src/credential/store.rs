//! Process-wide holder for the captured authentication cookie.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use cookie::Cookie;
use serde::{Deserialize, Serialize};

/// A captured cookie with every attribute it was received with.
pub type Credential = Cookie<'static>;

/// What happens when a capture cookie is seen while one is already held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CapturePolicy {
    /// Keep the first credential for the lifetime of the process.
    #[default]
    FirstWins,
    /// Replace the held credential whenever the upstream issues a new value.
    Refresh,
}

/// Outcome of offering a credential to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    /// The store was empty and now holds the offered credential.
    Adopted,
    /// A held credential was replaced by one with a different value.
    Refreshed,
    /// The store kept what it had.
    Ignored,
}

/// Shared, lock-free slot holding at most one credential.
///
/// Readers always see either the previous or the new credential in full.
/// Writers go through a compare-and-swap loop so concurrent captures never
/// interleave.
#[derive(Debug, Default)]
pub struct CredentialStore {
    slot: ArcSwapOption<Credential>,
}

impl CredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the held credential, if any.
    pub fn current(&self) -> Option<Arc<Credential>> {
        self.slot.load_full()
    }

    pub fn is_held(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Offer a freshly seen credential under the given policy.
    pub fn offer(&self, credential: Credential, policy: CapturePolicy) -> Adoption {
        let offered = Arc::new(credential);

        match policy {
            CapturePolicy::FirstWins => {
                let previous = self.slot.rcu(|held| match held {
                    Some(held) => Some(Arc::clone(held)),
                    None => Some(Arc::clone(&offered)),
                });
                if previous.is_none() {
                    Adoption::Adopted
                } else {
                    Adoption::Ignored
                }
            }
            CapturePolicy::Refresh => {
                let previous = self.slot.rcu(|held| match held {
                    Some(held) if held.value() == offered.value() => Some(Arc::clone(held)),
                    _ => Some(Arc::clone(&offered)),
                });
                match previous {
                    None => Adoption::Adopted,
                    Some(previous) if previous.value() != offered.value() => Adoption::Refreshed,
                    Some(_) => Adoption::Ignored,
                }
            }
        }
    }
}
