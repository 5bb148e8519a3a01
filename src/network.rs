// src/network.rs

//! Trader topology graphs. Each side of the market gets a static,
//! node-indexed adjacency structure; node ids are contiguous from 0 and
//! coincide with the per-side trader indices. Graphs are immutable once
//! built, so matching and propagation borrow them freely.

use crate::error::{Result, SimError};
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Topology family, as tagged in experiment configs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum NetworkSpec {
    /// Every trader sees every other trader on the opposite side.
    Complete,
    /// Erdos-Renyi G(n, p): each possible edge drawn independently.
    Random {
        #[serde(default = "default_gnp_p")]
        p: f64,
    },
    /// Watts-Strogatz: ring lattice of degree `k`, each ring edge rewired
    /// with probability `p`.
    SmallWorld {
        #[serde(default = "default_sw_k")]
        k: usize,
        #[serde(default = "default_sw_p")]
        p: f64,
    },
    /// Barabasi-Albert preferential attachment, `m` edges per new node.
    ScaleFree {
        #[serde(default = "default_sf_m")]
        m: usize,
    },
}

fn default_gnp_p() -> f64 {
    0.4
}

fn default_sw_k() -> usize {
    6
}

fn default_sw_p() -> f64 {
    0.6
}

fn default_sf_m() -> usize {
    4
}

/// Undirected graph over one side's trader nodes. Neighbor lists are kept
/// sorted so iteration order is stable across runs.
#[derive(Debug, Clone)]
pub struct Network {
    adj: Vec<Vec<usize>>,
    edges: usize,
}

impl Network {
    /// Build the topology for `n` nodes. Parameter bounds are checked here
    /// so a bad config fails before any trader is created.
    pub fn build(spec: &NetworkSpec, n: usize, rng: &mut StdRng) -> Result<Self> {
        let network = match *spec {
            NetworkSpec::Complete => Self::complete(n),
            NetworkSpec::Random { p } => {
                check_probability(p)?;
                Self::random(n, p, rng)
            }
            NetworkSpec::SmallWorld { k, p } => {
                if k >= n {
                    return Err(SimError::InvalidNetwork(format!(
                        "ring degree {} requires more than {} nodes",
                        k, n
                    )));
                }
                check_probability(p)?;
                Self::small_world(n, k, p, rng)
            }
            NetworkSpec::ScaleFree { m } => {
                if m < 1 || m >= n {
                    return Err(SimError::InvalidNetwork(format!(
                        "attachment count {} must be in 1..{}",
                        m, n
                    )));
                }
                Self::scale_free(n, m, rng)
            }
        };
        debug!(
            "built {:?}: {} nodes, {} edges",
            spec,
            network.node_count(),
            network.edge_count()
        );
        Ok(network)
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.adj[node]
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adj[node].len()
    }

    fn from_sets(sets: Vec<BTreeSet<usize>>) -> Self {
        let edges = sets.iter().map(BTreeSet::len).sum::<usize>() / 2;
        let adj = sets.into_iter().map(|s| s.into_iter().collect()).collect();
        Self { adj, edges }
    }

    fn complete(n: usize) -> Self {
        let adj: Vec<Vec<usize>> = (0..n)
            .map(|u| (0..n).filter(|&v| v != u).collect())
            .collect();
        let edges = n * n.saturating_sub(1) / 2;
        Self { adj, edges }
    }

    fn random(n: usize, p: f64, rng: &mut StdRng) -> Self {
        let mut sets = vec![BTreeSet::new(); n];
        for u in 0..n {
            for v in (u + 1)..n {
                if rng.gen_range(0.0..1.0) < p {
                    sets[u].insert(v);
                    sets[v].insert(u);
                }
            }
        }
        Self::from_sets(sets)
    }

    fn small_world(n: usize, k: usize, p: f64, rng: &mut StdRng) -> Self {
        let mut sets = vec![BTreeSet::new(); n];
        let half = k / 2;
        for u in 0..n {
            for j in 1..=half {
                let v = (u + j) % n;
                sets[u].insert(v);
                sets[v].insert(u);
            }
        }
        // Rewire each ring edge at most once, from its lower endpoint. The
        // edge count never changes.
        for j in 1..=half {
            for u in 0..n {
                if rng.gen_range(0.0..1.0) >= p {
                    continue;
                }
                if sets[u].len() >= n - 1 {
                    // Saturated node, no non-neighbor left to rewire to.
                    continue;
                }
                let old = (u + j) % n;
                let mut w = rng.gen_range(0..n);
                while w == u || sets[u].contains(&w) {
                    w = rng.gen_range(0..n);
                }
                sets[u].remove(&old);
                sets[old].remove(&u);
                sets[u].insert(w);
                sets[w].insert(u);
            }
        }
        Self::from_sets(sets)
    }

    fn scale_free(n: usize, m: usize, rng: &mut StdRng) -> Self {
        let mut sets = vec![BTreeSet::new(); n];
        // Attachment is degree-weighted: every edge endpoint lands in
        // `repeated`, so sampling it uniformly is preferential attachment.
        let mut repeated: Vec<usize> = Vec::with_capacity(2 * m * n);
        let mut targets: Vec<usize> = (0..m).collect();
        for source in m..n {
            for &t in &targets {
                sets[source].insert(t);
                sets[t].insert(source);
            }
            repeated.extend_from_slice(&targets);
            repeated.extend(std::iter::repeat(source).take(m));
            let mut picked = BTreeSet::new();
            while picked.len() < m {
                picked.insert(repeated[rng.gen_range(0..repeated.len())]);
            }
            targets = picked.into_iter().collect();
        }
        Self::from_sets(sets)
    }
}

fn check_probability(p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimError::InvalidNetwork(format!(
            "probability {} is outside [0, 1]",
            p
        )))
    }
}

// ----- Unit Tests -----
