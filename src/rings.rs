use std::collections::VecDeque;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::mol::{component_labels, Mol};

/// Smallest set of smallest rings plus per-atom and per-bond membership.
#[derive(Debug, Clone)]
pub struct RingInfo {
    rings: Vec<Vec<NodeIndex>>,
    ring_edges: Vec<bool>,
    atom_ring_bonds: Vec<usize>,
}

impl RingInfo {
    pub fn sssr<A, B>(mol: &Mol<A, B>) -> Self {
        let num_expected = expected_ring_count(mol);
        let rings = if num_expected == 0 {
            Vec::new()
        } else {
            select_independent_rings(&horton_candidates(mol), num_expected, mol)
        };

        let mut ring_edges = vec![false; mol.bond_count()];
        for ring in &rings {
            for edge in ring_edges_of(ring, mol) {
                ring_edges[edge.index()] = true;
            }
        }

        let atom_ring_bonds = mol
            .atoms()
            .map(|a| {
                mol.bonds_of(a)
                    .filter(|e| ring_edges[e.index()])
                    .count()
            })
            .collect();

        Self {
            rings,
            ring_edges,
            atom_ring_bonds,
        }
    }

    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings
    }

    pub fn is_ring_atom(&self, atom: NodeIndex) -> bool {
        self.ring_bond_count(atom) > 0
    }

    pub fn is_ring_bond(&self, edge: EdgeIndex) -> bool {
        self.ring_edges.get(edge.index()).copied().unwrap_or(false)
    }

    pub fn ring_bond_count(&self, atom: NodeIndex) -> usize {
        self.atom_ring_bonds.get(atom.index()).copied().unwrap_or(0)
    }

    /// Number of SSSR rings containing `atom`.
    pub fn ring_membership(&self, atom: NodeIndex) -> usize {
        self.rings.iter().filter(|r| r.contains(&atom)).count()
    }

    pub fn smallest_ring_size(&self, atom: NodeIndex) -> Option<usize> {
        self.rings
            .iter()
            .filter(|ring| ring.contains(&atom))
            .map(|ring| ring.len())
            .min()
    }
}

/// Cyclomatic number: bonds - atoms + components.
pub fn expected_ring_count<A, B>(mol: &Mol<A, B>) -> usize {
    let (_, components) = component_labels(mol);
    (mol.bond_count() + components).saturating_sub(mol.atom_count())
}

/// Bonds around a ring given as a closed atom cycle.
pub fn ring_edges_of<A, B>(ring: &[NodeIndex], mol: &Mol<A, B>) -> Vec<EdgeIndex> {
    let len = ring.len();
    (0..len)
        .filter_map(|i| mol.bond_between(ring[i], ring[(i + 1) % len]))
        .collect()
}

struct ShortestPaths {
    dist: Vec<Vec<u32>>,
    pred: Vec<Vec<Option<NodeIndex>>>,
}

impl ShortestPaths {
    fn compute<A, B>(mol: &Mol<A, B>) -> Self {
        let n = mol.atom_count();
        let mut dist = vec![vec![u32::MAX; n]; n];
        let mut pred = vec![vec![None; n]; n];
        for src in mol.atoms() {
            let s = src.index();
            dist[s][s] = 0;
            let mut queue = VecDeque::from([src]);
            while let Some(cur) = queue.pop_front() {
                let d = dist[s][cur.index()];
                for nb in mol.neighbors(cur) {
                    if dist[s][nb.index()] == u32::MAX {
                        dist[s][nb.index()] = d + 1;
                        pred[s][nb.index()] = Some(cur);
                        queue.push_back(nb);
                    }
                }
            }
        }
        Self { dist, pred }
    }

    fn path(&self, src: NodeIndex, dst: NodeIndex) -> Option<Vec<NodeIndex>> {
        let mut path = vec![dst];
        let mut cur = dst;
        while cur != src {
            cur = self.pred[src.index()][cur.index()]?;
            path.push(cur);
        }
        path.reverse();
        Some(path)
    }
}

fn horton_candidates<A, B>(mol: &Mol<A, B>) -> Vec<Vec<NodeIndex>> {
    let sp = ShortestPaths::compute(mol);
    let mut candidates: Vec<Vec<NodeIndex>> = Vec::new();

    for edge in mol.bonds() {
        let Some((u, v)) = mol.bond_endpoints(edge) else {
            continue;
        };
        for w in mol.atoms() {
            let du = sp.dist[w.index()][u.index()];
            let dv = sp.dist[w.index()][v.index()];
            if du == u32::MAX || dv == u32::MAX || du + dv + 1 < 3 {
                continue;
            }
            let (Some(path_u), Some(path_v)) = (sp.path(w, u), sp.path(w, v)) else {
                continue;
            };
            if path_u[1..].iter().any(|node| path_v[1..].contains(node)) {
                continue;
            }
            let mut ring = path_u;
            ring.extend(path_v[1..].iter().rev());
            candidates.push(normalize_ring(&ring));
        }
    }

    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    candidates.dedup();
    candidates
}

fn select_independent_rings<A, B>(
    candidates: &[Vec<NodeIndex>],
    num_needed: usize,
    mol: &Mol<A, B>,
) -> Vec<Vec<NodeIndex>> {
    let words = mol.bond_count().div_ceil(64);
    let mut result = Vec::with_capacity(num_needed);
    let mut basis: Vec<Vec<u64>> = Vec::with_capacity(num_needed);

    for ring in candidates {
        if result.len() >= num_needed {
            break;
        }
        let mut bv = vec![0u64; words];
        for edge in ring_edges_of(ring, mol) {
            bv[edge.index() / 64] |= 1u64 << (edge.index() % 64);
        }
        if try_add_to_basis(&mut basis, bv) {
            result.push(ring.clone());
        }
    }
    result
}

/// One elimination step over GF(2); each row keeps a distinct lowest bit.
fn try_add_to_basis(basis: &mut Vec<Vec<u64>>, mut v: Vec<u64>) -> bool {
    for row in basis.iter() {
        if let Some(p) = lowest_bit(row) {
            if v[p / 64] & (1u64 << (p % 64)) != 0 {
                for (aw, bw) in v.iter_mut().zip(row) {
                    *aw ^= *bw;
                }
            }
        }
    }
    if v.iter().all(|&w| w == 0) {
        return false;
    }
    basis.push(v);
    true
}

fn lowest_bit(bv: &[u64]) -> Option<usize> {
    bv.iter()
        .enumerate()
        .find(|(_, &w)| w != 0)
        .map(|(i, &w)| i * 64 + w.trailing_zeros() as usize)
}

/// Rotate so the lowest index is first and orient towards the smaller neighbor.
fn normalize_ring(ring: &[NodeIndex]) -> Vec<NodeIndex> {
    let Some(min_pos) = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, idx)| idx)
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    let mut normalized: Vec<NodeIndex> = ring[min_pos..]
        .iter()
        .chain(&ring[..min_pos])
        .copied()
        .collect();
    let len = normalized.len();
    if len > 2 && normalized[1] > normalized[len - 1] {
        normalized[1..].reverse();
    }
    normalized
}
