//! Probabilistic receiver selection for sending nodes.

use crate::id::ReceiverId;
use crate::rng::ProbabilityGenerator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors raised while picking a receiver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("no receiver registered")]
    NoReceiver,
}

/// A sender's routing table: receiver handle to selection probability.
///
/// Weights are kept uniform: every structural change renormalizes all entries
/// to `1/k` for `k` registered receivers. Entries iterate in `ReceiverId`
/// order (workers first, then storehouses, each by identity).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiverPreferences {
    preferences: BTreeMap<ReceiverId, f64>,
}

impl ReceiverPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a receiver. Returns `false` if it was already registered, in
    /// which case the weights are left untouched.
    pub fn add_receiver(&mut self, receiver: ReceiverId) -> bool {
        if self.preferences.contains_key(&receiver) {
            return false;
        }
        self.preferences.insert(receiver, 0.0);
        self.renormalize();
        true
    }

    /// Unregister a receiver. Returns `false` if it was not registered.
    pub fn remove_receiver(&mut self, receiver: ReceiverId) -> bool {
        if self.preferences.remove(&receiver).is_none() {
            return false;
        }
        self.renormalize();
        true
    }

    fn renormalize(&mut self) {
        if self.preferences.is_empty() {
            return;
        }
        let p = 1.0 / self.preferences.len() as f64;
        for weight in self.preferences.values_mut() {
            *weight = p;
        }
    }

    pub fn contains(&self, receiver: ReceiverId) -> bool {
        self.preferences.contains_key(&receiver)
    }

    pub fn probability(&self, receiver: ReceiverId) -> Option<f64> {
        self.preferences.get(&receiver).copied()
    }

    pub fn len(&self) -> usize {
        self.preferences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty()
    }

    /// `(receiver, probability)` pairs in routing order.
    pub fn iter(&self) -> impl Iterator<Item = (ReceiverId, f64)> + '_ {
        self.preferences.iter().map(|(r, p)| (*r, *p))
    }

    pub fn receivers(&self) -> impl Iterator<Item = ReceiverId> + '_ {
        self.preferences.keys().copied()
    }

    /// Pick a receiver by walking cumulative weights against one draw from
    /// `generator`.
    ///
    /// If floating-point accumulation leaves the total below the draw, the
    /// last receiver in routing order is returned.
    pub fn choose_receiver(
        &self,
        generator: &mut dyn ProbabilityGenerator,
    ) -> Result<ReceiverId, RoutingError> {
        let last = *self
            .preferences
            .keys()
            .next_back()
            .ok_or(RoutingError::NoReceiver)?;

        let r = generator.next_probability();
        let mut cumulative = 0.0;
        for (receiver, weight) in &self.preferences {
            cumulative += weight;
            if r <= cumulative {
                return Ok(*receiver);
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{SequenceGenerator, SimRng};

    fn assert_uniform(prefs: &ReceiverPreferences) {
        let n = prefs.len();
        let sum: f64 = prefs.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-9, "weights sum to {sum}");
        for (r, p) in prefs.iter() {
            assert!((p - 1.0 / n as f64).abs() < 1e-12, "{r} has weight {p}");
        }
    }

    #[test]
    fn adding_receivers_renormalizes() {
        let mut prefs = ReceiverPreferences::new();
        assert!(prefs.add_receiver(ReceiverId::worker(1)));
        assert_eq!(prefs.probability(ReceiverId::worker(1)), Some(1.0));

        prefs.add_receiver(ReceiverId::storehouse(1));
        prefs.add_receiver(ReceiverId::worker(2));
        assert_eq!(prefs.len(), 3);
        assert_uniform(&prefs);
    }

    #[test]
    fn duplicate_add_is_noop() {
        let mut prefs = ReceiverPreferences::new();
        prefs.add_receiver(ReceiverId::worker(1));
        prefs.add_receiver(ReceiverId::worker(2));
        assert!(!prefs.add_receiver(ReceiverId::worker(1)));
        assert_eq!(prefs.len(), 2);
        assert_uniform(&prefs);
    }

    #[test]
    fn removing_receiver_renormalizes() {
        let mut prefs = ReceiverPreferences::new();
        for id in 1..=4 {
            prefs.add_receiver(ReceiverId::worker(id));
        }
        assert!(prefs.remove_receiver(ReceiverId::worker(2)));
        assert!(!prefs.contains(ReceiverId::worker(2)));
        assert_eq!(prefs.len(), 3);
        assert_uniform(&prefs);

        assert!(!prefs.remove_receiver(ReceiverId::worker(2)));
    }

    #[test]
    fn removing_last_receiver_leaves_empty_table() {
        let mut prefs = ReceiverPreferences::new();
        prefs.add_receiver(ReceiverId::storehouse(9));
        prefs.remove_receiver(ReceiverId::storehouse(9));
        assert!(prefs.is_empty());
    }

    #[test]
    fn choose_with_no_receivers_fails() {
        let prefs = ReceiverPreferences::new();
        let mut g = SequenceGenerator::new([0.5]);
        assert_eq!(prefs.choose_receiver(&mut g), Err(RoutingError::NoReceiver));
    }

    #[test]
    fn choose_walks_cumulative_weights_in_order() {
        let mut prefs = ReceiverPreferences::new();
        prefs.add_receiver(ReceiverId::storehouse(1));
        prefs.add_receiver(ReceiverId::worker(5));
        prefs.add_receiver(ReceiverId::worker(3));
        // Order: worker 3, worker 5, storehouse 1; each 1/3.
        let mut g = SequenceGenerator::new([0.0, 0.2, 0.5, 0.9]);
        let picks: Vec<ReceiverId> = (0..4)
            .map(|_| prefs.choose_receiver(&mut g).unwrap())
            .collect();
        assert_eq!(
            picks,
            vec![
                ReceiverId::worker(3),
                ReceiverId::worker(3),
                ReceiverId::worker(5),
                ReceiverId::storehouse(1),
            ]
        );
    }

    #[test]
    fn rounding_shortfall_falls_back_to_last_receiver() {
        let mut prefs = ReceiverPreferences::new();
        for id in 1..=3 {
            prefs.add_receiver(ReceiverId::worker(id));
        }
        // 3 * (1/3) may round below a draw this close to one.
        let mut g = SequenceGenerator::new([1.0 - f64::EPSILON / 4.0]);
        assert_eq!(prefs.choose_receiver(&mut g), Ok(ReceiverId::worker(3)));
    }

    #[test]
    fn choices_are_roughly_uniform() {
        let mut prefs = ReceiverPreferences::new();
        prefs.add_receiver(ReceiverId::worker(1));
        prefs.add_receiver(ReceiverId::storehouse(1));
        let mut rng = SimRng::new(99);
        let workers = (0..10_000)
            .filter(|_| prefs.choose_receiver(&mut rng).unwrap() == ReceiverId::worker(1))
            .count();
        assert!((4000..=6000).contains(&workers), "got {workers}");
    }
}
