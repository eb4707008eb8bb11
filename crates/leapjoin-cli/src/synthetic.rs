//! Deterministic synthetic edge relations for the perf harness.

use leapjoin_core::Key;

/// Minimal deterministic RNG (no external deps).
#[derive(Debug, Clone)]
pub(crate) struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub(crate) fn new(seed: u64) -> Self {
        // Avoid the degenerate all-zero state.
        let state = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    pub(crate) fn gen_key(&mut self, upper: Key) -> Key {
        if upper == 0 {
            return 0;
        }
        (self.next_u64() % u64::from(upper)) as Key
    }
}

/// `edges_per_node` random out-edges for every node in `0..nodes`.
///
/// Targets may repeat; the relation backends collapse duplicate pairs.
pub(crate) fn random_edges(nodes: Key, edges_per_node: usize, seed: u64) -> Vec<(Key, Key)> {
    let mut rng = XorShift64::new(seed);
    let mut edges = Vec::with_capacity(nodes as usize * edges_per_node);
    for source in 0..nodes {
        for _ in 0..edges_per_node {
            edges.push((source, rng.gen_key(nodes)));
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_edges() {
        assert_eq!(random_edges(50, 3, 7), random_edges(50, 3, 7));
        assert_ne!(random_edges(50, 3, 7), random_edges(50, 3, 8));
    }

    #[test]
    fn edges_stay_in_node_range() {
        let edges = random_edges(20, 4, 1);
        assert_eq!(edges.len(), 80);
        assert!(edges.iter().all(|&(s, t)| s < 20 && t < 20));
    }

    #[test]
    fn zero_seed_is_not_stuck() {
        let mut rng = XorShift64::new(0);
        let a = rng.next_u64();
        let b = rng.next_u64();
        assert_ne!(a, b);
    }
}
