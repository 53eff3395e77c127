use std::sync::{
    Arc,
    Mutex,
};

use tracing::info;

use crate::ring::{
    HashRing,
    RingError,
};

/// Shared ownership of the hash ring.
///
/// The ring itself is a plain data structure; this handle publishes it to
/// concurrent readers as an immutable snapshot. Membership changes clone the
/// current snapshot, apply the whole mutation, and swap the new snapshot in
/// under the lock, so a lookup racing an add or remove sees either all of a
/// node's positions or none of them. Readers hold the lock only long enough
/// to clone the `Arc`.
#[derive(Clone)]
pub struct Cluster {
    state: Arc<Mutex<Arc<HashRing>>>,
}

impl Cluster {
    pub fn new<I, S>(replicas: usize, slots: u64, initial_nodes: I) -> Result<Self, RingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ring = HashRing::with_nodes(replicas, slots, initial_nodes)?;
        info!(members = ring.len(), replicas = ring.replicas(), slots = ring.slots(), "ring initialized");

        Ok(Self {
            state: Arc::new(Mutex::new(Arc::new(ring))),
        })
    }

    /// The current ring snapshot.
    pub fn ring(&self) -> Arc<HashRing> {
        self.state.lock().unwrap().clone()
    }

    /// Resolve a key against the current snapshot.
    pub fn lookup(&self, key: &str) -> Result<String, RingError> {
        self.ring().lookup(key).map(str::to_owned)
    }

    /// Current membership, sorted for stable presentation.
    pub fn members(&self) -> Vec<String> {
        let ring = self.ring();
        let mut members: Vec<String> = ring.members().iter().cloned().collect();
        members.sort();
        members
    }

    /// Add a node, unless it is already a member.
    ///
    /// Returns whether membership changed. The already-member guard lives
    /// here rather than in the ring, which stays non-idempotent.
    pub fn add_node(&self, node: &str) -> Result<bool, RingError> {
        let mut state = self.state.lock().unwrap();
        if state.members().contains(node) {
            return Ok(false);
        }

        let mut ring = (**state).clone();
        ring.add_node(node)?;
        let members = ring.len();
        *state = Arc::new(ring);
        drop(state);

        info!(node, members, "node added to ring");
        Ok(true)
    }

    /// Remove a node if it is a member. Returns whether membership changed.
    pub fn remove_node(&self, node: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.members().contains(node) {
            return false;
        }

        let mut ring = (**state).clone();
        ring.remove_node(node);
        let members = ring.len();
        *state = Arc::new(ring);
        drop(state);

        info!(node, members, "node removed from ring");
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::ring::{
        DEFAULT_REPLICAS,
        DEFAULT_SLOTS,
    };

    fn new_cluster(nodes: &[&str]) -> Cluster {
        Cluster::new(DEFAULT_REPLICAS, DEFAULT_SLOTS, nodes).unwrap()
    }

    #[test]
    fn test_add_is_guarded_against_double_add() {
        let cluster = new_cluster(&["node-a"]);

        assert!(cluster.add_node("node-b").unwrap());
        assert!(!cluster.add_node("node-b").unwrap());
        assert_eq!(cluster.members(), vec!["node-a", "node-b"]);
    }

    #[test]
    fn test_remove_reports_membership_change() {
        let cluster = new_cluster(&["node-a", "node-b"]);

        assert!(cluster.remove_node("node-a"));
        assert!(!cluster.remove_node("node-a"));
        assert_eq!(cluster.members(), vec!["node-b"]);
    }

    #[test]
    fn test_snapshot_is_stable_across_mutation() {
        let cluster = new_cluster(&["node-a", "node-b"]);
        let snapshot = cluster.ring();

        cluster.remove_node("node-b");

        // The snapshot taken before the change still resolves against the old
        // membership; the current state does not.
        assert_eq!(snapshot.len(), 2);
        assert_eq!(cluster.ring().len(), 1);
    }

    #[test]
    fn test_lookup_resolves_via_current_snapshot() {
        let cluster = new_cluster(&[]);
        assert_eq!(cluster.lookup("key"), Err(RingError::EmptyRing));

        cluster.add_node("node-a").unwrap();
        assert_eq!(cluster.lookup("key").as_deref(), Ok("node-a"));
    }

    #[test]
    fn test_concurrent_lookups_never_observe_non_members() {
        let cluster = new_cluster(&["node-a", "node-b", "node-c"]);
        let ever_valid: HashSet<String> =
            ["node-a", "node-b", "node-c", "node-d"].iter().map(|s| s.to_string()).collect();

        std::thread::scope(|scope| {
            for reader in 0..8 {
                let cluster = cluster.clone();
                let ever_valid = &ever_valid;
                scope.spawn(move || {
                    for i in 0..5_000 {
                        match cluster.lookup(&format!("key-{reader}-{i}")) {
                            Ok(node) => assert!(ever_valid.contains(&node)),
                            Err(RingError::EmptyRing) => panic!("ring emptied during stress"),
                            Err(e) => panic!("unexpected lookup error: {e}"),
                        }
                    }
                });
            }

            let mutator = cluster.clone();
            scope.spawn(move || {
                for _ in 0..200 {
                    mutator.add_node("node-d").unwrap();
                    mutator.remove_node("node-d");
                }
            });
        });

        assert_eq!(cluster.members(), vec!["node-a", "node-b", "node-c"]);
    }
}
