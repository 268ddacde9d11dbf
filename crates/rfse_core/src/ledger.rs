//! Inventory ledger: the authoritative resource store for one run.
//!
//! Quantities never go negative. Reads of unknown resources return zero.
//! Debits check full availability before mutating and never partially apply.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{ResourceId, ResourceMap};
use crate::math::Quantity;

/// A debit that could not be covered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    /// The resource that ran short.
    pub resource: ResourceId,
    /// Quantity that was required.
    pub required: Quantity,
    /// Quantity that was available.
    pub available: Quantity,
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "insufficient {}: need {}, have {}",
            self.resource, self.required, self.available
        )
    }
}

impl std::error::Error for Shortfall {}

/// Immutable copy of ledger contents.
pub type LedgerSnapshot = BTreeMap<ResourceId, Quantity>;

/// Mutable resource-quantity store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryLedger {
    stock: BTreeMap<ResourceId, Quantity>,
}

impl InventoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger from an initial inventory snapshot.
    ///
    /// Negative entries are clamped to zero.
    #[must_use]
    pub fn from_snapshot<I, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (R, Quantity)>,
        R: Into<ResourceId>,
    {
        let mut ledger = Self::new();
        for (resource, quantity) in entries {
            if quantity > Quantity::ZERO {
                ledger.credit(resource, quantity);
            }
        }
        ledger
    }

    /// Quantity on hand (zero for unknown resources).
    #[must_use]
    pub fn get(&self, resource: &str) -> Quantity {
        self.stock.get(resource).copied().unwrap_or_default()
    }

    /// Add `quantity` of `resource` and return the amount actually added.
    ///
    /// Non-positive credits are ignored. Stock saturates at the quantity
    /// range, so the result is less than `quantity` only at that ceiling.
    pub fn credit(&mut self, resource: impl Into<ResourceId>, quantity: Quantity) -> Quantity {
        if quantity <= Quantity::ZERO {
            return Quantity::ZERO;
        }
        let entry = self.stock.entry(resource.into()).or_default();
        let before = *entry;
        *entry = entry.saturating_add(quantity);
        *entry - before
    }

    /// Remove `quantity` of `resource` if fully available.
    ///
    /// # Errors
    ///
    /// Returns a [`Shortfall`] and leaves the ledger unchanged if less than
    /// `quantity` is on hand.
    pub fn debit(&mut self, resource: &str, quantity: Quantity) -> Result<(), Shortfall> {
        if quantity <= Quantity::ZERO {
            return Ok(());
        }
        let available = self.get(resource);
        if available < quantity {
            return Err(Shortfall {
                resource: ResourceId::from(resource),
                required: quantity,
                available,
            });
        }
        if let Some(entry) = self.stock.get_mut(resource) {
            *entry -= quantity;
        }
        Ok(())
    }

    /// Check whether every entry of `bundle` is covered.
    ///
    /// Returns the first shortfall in resource order, if any.
    #[must_use]
    pub fn check(&self, bundle: &ResourceMap) -> Option<Shortfall> {
        bundle.iter().find_map(|(resource, &required)| {
            let available = self.get(resource.as_str());
            (available < required).then(|| Shortfall {
                resource: resource.clone(),
                required,
                available,
            })
        })
    }

    /// Debit every entry of `bundle`, or none of them.
    ///
    /// # Errors
    ///
    /// Returns the first [`Shortfall`] without mutating the ledger.
    pub fn debit_all(&mut self, bundle: &ResourceMap) -> Result<(), Shortfall> {
        if let Some(shortfall) = self.check(bundle) {
            return Err(shortfall);
        }
        for (resource, &quantity) in bundle {
            self.debit(resource.as_str(), quantity)?;
        }
        Ok(())
    }

    /// Credit every entry of `bundle`.
    ///
    /// Returns the amount actually added per resource.
    pub fn credit_all(&mut self, bundle: &ResourceMap) -> ResourceMap {
        bundle
            .iter()
            .map(|(resource, &quantity)| (resource.clone(), self.credit(resource.clone(), quantity)))
            .collect()
    }

    /// Immutable copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.stock.clone()
    }

    /// Iterate over stocked resources in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, Quantity)> {
        self.stock.iter().map(|(r, &q)| (r, q))
    }

    /// Number of resources with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stock.len()
    }

    /// Check if the ledger has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }
}
