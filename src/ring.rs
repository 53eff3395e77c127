use std::collections::{
    BTreeMap,
    HashSet,
    hash_map::DefaultHasher,
};
use std::hash::{
    Hash,
    Hasher,
};

use thiserror::Error;

/// Virtual replicas placed per node unless configured otherwise.
pub const DEFAULT_REPLICAS: usize = 9;

/// Size of the modular hash space unless configured otherwise.
pub const DEFAULT_SLOTS: u64 = 512;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("ring has no members")]
    EmptyRing,

    #[error("node identifier must not be empty")]
    InvalidNode,
}

/// A consistent hash ring over a fixed-size modular hash space.
///
/// Each node is placed at `replicas` pseudo-random positions in `[0, slots)`.
/// A key resolves to the node owning the first occupied position at or after
/// the key's own position, wrapping to the smallest occupied position past
/// the end of the space. Adding or removing a node only moves that node's
/// positions, so only keys whose successor changes are remapped.
#[derive(Debug, Clone)]
pub struct HashRing {
    /// Occupied positions, kept sorted, each owned by a member node.
    index: BTreeMap<u64, String>,

    /// Nodes currently placed on the ring.
    members: HashSet<String>,

    /// Virtual positions placed per node. Fixed at construction.
    replicas: usize,

    /// Size of the hash space. Fixed at construction.
    slots: u64,
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS, DEFAULT_SLOTS)
    }
}

impl HashRing {
    /// Create an empty ring with `replicas` virtual positions per node on a
    /// hash space of `slots` positions.
    pub fn new(replicas: usize, slots: u64) -> Self {
        HashRing {
            index: BTreeMap::new(),
            members: HashSet::new(),
            replicas,
            slots,
        }
    }

    /// Create a ring pre-populated with the given nodes.
    pub fn with_nodes<I, S>(replicas: usize, slots: u64, nodes: I) -> Result<Self, RingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ring = Self::new(replicas, slots);
        for node in nodes {
            ring.add_node(node.as_ref())?;
        }
        Ok(ring)
    }

    /// Place a node on the ring.
    ///
    /// Inserts one position per virtual replica. If a position is already
    /// occupied the new mapping overwrites the old one (placement collisions
    /// are rare at a sane slot count and resolved last-write-wins). Re-adding
    /// a present node re-inserts the same deterministic positions; callers
    /// wanting idempotence check membership first.
    pub fn add_node(&mut self, node: &str) -> Result<(), RingError> {
        if node.is_empty() {
            return Err(RingError::InvalidNode);
        }

        for replica_index in 0..self.replicas {
            let position = Self::placement_position(node, replica_index, self.slots);
            self.index.insert(position, node.to_string());
        }
        self.members.insert(node.to_string());
        Ok(())
    }

    /// Take a node off the ring.
    ///
    /// Recomputes the node's replica positions and deletes each entry still
    /// owned by the node (a colliding later add may have overwritten one, in
    /// which case the entry belongs to the other node and stays). Removing a
    /// node that was never added is a no-op.
    pub fn remove_node(&mut self, node: &str) {
        for replica_index in 0..self.replicas {
            let position = Self::placement_position(node, replica_index, self.slots);
            if self.index.get(&position).is_some_and(|owner| owner == node) {
                self.index.remove(&position);
            }
        }
        self.members.remove(node);
    }

    /// Resolve a key to the member node owning it.
    pub fn lookup(&self, key: &str) -> Result<&str, RingError> {
        self.lookup_at(Self::request_position(key, self.slots))
    }

    /// Resolve a raw ring position: first occupied position `>= position`,
    /// wrapping to the smallest occupied position.
    fn lookup_at(&self, position: u64) -> Result<&str, RingError> {
        self.index
            .range(position..)
            .next()
            .or_else(|| self.index.iter().next())
            .map(|(_, node)| node.as_str())
            .ok_or(RingError::EmptyRing)
    }

    /// Nodes currently placed on the ring.
    pub fn members(&self) -> &HashSet<String> {
        &self.members
    }

    /// The sorted position index, for diagnostics. Never mutated by callers.
    pub fn positions(&self) -> &BTreeMap<u64, String> {
        &self.index
    }

    /// Number of member nodes.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }

    pub fn slots(&self) -> u64 {
        self.slots
    }

    /// Position of one virtual replica of a node. Hashes the textual
    /// `"node:replica_index"` form so placement is a pure function of the
    /// identifier, stable across runs.
    fn placement_position(node: &str, replica_index: usize, slots: u64) -> u64 {
        Self::digest(&format!("{node}:{replica_index}")) % slots
    }

    /// Position of a request key on the same hash space.
    fn request_position(key: &str, slots: u64) -> u64 {
        Self::digest(key) % slots
    }

    fn digest(value: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn three_node_ring() -> HashRing {
        HashRing::with_nodes(DEFAULT_REPLICAS, DEFAULT_SLOTS, ["node-a", "node-b", "node-c"]).unwrap()
    }

    #[test]
    fn test_empty_ring() {
        let ring = HashRing::default();
        assert_eq!(ring.lookup("test_key"), Err(RingError::EmptyRing));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_resolves_after_first_add() {
        let mut ring = HashRing::default();
        assert_eq!(ring.lookup("test_key"), Err(RingError::EmptyRing));

        ring.add_node("node-a").unwrap();
        assert_eq!(ring.lookup("test_key"), Ok("node-a"));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.positions().len(), DEFAULT_REPLICAS);
    }

    #[test]
    fn test_rejects_empty_identifier() {
        let mut ring = HashRing::default();
        assert_eq!(ring.add_node(""), Err(RingError::InvalidNode));
        assert!(ring.is_empty());
        assert!(ring.positions().is_empty());
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let ring = three_node_ring();
        for i in 0..100 {
            let key = format!("key-{i}");
            let first = ring.lookup(&key).unwrap().to_string();
            for _ in 0..10 {
                assert_eq!(ring.lookup(&key), Ok(first.as_str()));
            }
        }
    }

    #[test]
    fn test_lookup_always_returns_a_member() {
        let ring = three_node_ring();
        for i in 0..1000 {
            let node = ring.lookup(&format!("key-{i}")).unwrap();
            assert!(ring.members().contains(node));
        }
    }

    #[test]
    fn test_never_returns_removed_node() {
        let mut ring = three_node_ring();
        ring.remove_node("node-b");

        assert!(!ring.members().contains("node-b"));
        for i in 0..1000 {
            assert_ne!(ring.lookup(&format!("key-{i}")).unwrap(), "node-b");
        }
    }

    #[test]
    fn test_position_equal_to_entry_resolves_to_that_entry() {
        let ring = three_node_ring();
        for (position, owner) in ring.positions() {
            assert_eq!(ring.lookup_at(*position), Ok(owner.as_str()));
        }
    }

    #[test]
    fn test_wraparound_to_smallest_position() {
        let ring = three_node_ring();
        let (first_position, first_owner) = ring.positions().iter().next().unwrap();
        let last_position = *ring.positions().keys().next_back().unwrap();

        // Position zero sits at or before every entry, so it resolves to the
        // smallest one.
        assert_eq!(ring.lookup_at(0), Ok(first_owner.as_str()));
        assert_eq!(ring.lookup_at(*first_position), Ok(first_owner.as_str()));

        // Any position past the last entry wraps to the smallest one.
        if last_position + 1 < ring.slots() {
            assert_eq!(ring.lookup_at(last_position + 1), Ok(first_owner.as_str()));
            assert_eq!(ring.lookup_at(ring.slots() - 1), Ok(first_owner.as_str()));
        }
    }

    #[test]
    fn test_remove_never_added_is_noop() {
        let ring = three_node_ring();
        let mut touched = ring.clone();
        touched.remove_node("node-x");

        assert_eq!(ring.positions(), touched.positions());
        assert_eq!(ring.members(), touched.members());
    }

    #[test]
    fn test_add_then_remove_restores_prior_mapping() {
        // A large slot count keeps placement collisions out of the picture,
        // so the index must come back byte-for-byte.
        let mut ring = HashRing::with_nodes(DEFAULT_REPLICAS, 1 << 32, ["node-a", "node-b", "node-c"]).unwrap();
        let before = ring.clone();

        ring.add_node("node-d").unwrap();
        ring.remove_node("node-d");

        assert_eq!(ring.positions(), before.positions());
        assert_eq!(ring.members(), before.members());
        for i in 0..1000 {
            let key = format!("key-{i}");
            assert_eq!(ring.lookup(&key), before.lookup(&key));
        }
    }

    #[test]
    fn test_adding_a_node_moves_a_small_fraction_of_keys() {
        let mut ring = three_node_ring();
        let keys: Vec<String> = (0..10_000).map(|i| format!("key-{i}")).collect();

        let before: Vec<String> = keys.iter().map(|k| ring.lookup(k).unwrap().to_string()).collect();
        ring.add_node("node-d").unwrap();

        let moved = keys
            .iter()
            .zip(&before)
            .filter(|(key, old)| ring.lookup(key).unwrap() != old.as_str())
            .count();

        // Expected ~1/4 of the key space. Allow a generous band rather than a
        // reshuffle: strictly between zero and half.
        assert!(moved > 0, "new node captured no keys");
        assert!(moved < 5_000, "adding one node moved {moved} of 10000 keys");

        // Keys that moved all landed on the new node.
        for (key, old) in keys.iter().zip(&before) {
            let now = ring.lookup(key).unwrap();
            if now != old.as_str() {
                assert_eq!(now, "node-d");
            }
        }
    }

    #[test]
    fn test_exactly_replicas_positions_per_node_without_collisions() {
        let ring = HashRing::with_nodes(DEFAULT_REPLICAS, 1 << 32, ["node-a", "node-b", "node-c"]).unwrap();
        for node in ["node-a", "node-b", "node-c"] {
            let owned = ring.positions().values().filter(|owner| *owner == node).count();
            assert_eq!(owned, DEFAULT_REPLICAS);
        }
    }

    proptest! {
        #[test]
        fn prop_lookup_covers_members(key in ".*") {
            let ring = three_node_ring();
            let node = ring.lookup(&key).unwrap();
            prop_assert!(ring.members().contains(node));
        }

        #[test]
        fn prop_lookup_is_pure(key in ".*") {
            let ring = three_node_ring();
            prop_assert_eq!(ring.lookup(&key), ring.lookup(&key));
        }
    }
}
