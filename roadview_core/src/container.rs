//! Sequence behavior shared by trajectories and frames.

use crate::arena::ObservationKey;

/// An ordered view over observation keys.
pub trait ObservationContainer {
    /// Keys in container order.
    fn keys(&self) -> &[ObservationKey];

    fn len(&self) -> usize {
        self.keys().len()
    }

    fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Key at `index` in container order.
    fn get(&self, index: usize) -> Option<ObservationKey> {
        self.keys().get(index).copied()
    }

    fn first(&self) -> Option<ObservationKey> {
        self.keys().first().copied()
    }

    fn last(&self) -> Option<ObservationKey> {
        self.keys().last().copied()
    }

    fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, ObservationKey>> {
        self.keys().iter().copied()
    }

    fn contains(&self, key: ObservationKey) -> bool {
        self.keys().contains(&key)
    }
}
