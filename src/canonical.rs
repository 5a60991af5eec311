//! Canonical atom ranking.
//!
//! Ranks start from caller-supplied atom invariants, are refined with
//! Morgan-style neighbourhood hashing, and remaining ties are broken by
//! trying every atom of the lowest tied class and keeping the refinement
//! whose invariant trace is lexicographically smallest. The result is a
//! permutation `0..n` that depends only on the graph and its invariants,
//! never on input atom order.

use std::hash::{Hash, Hasher};

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::Mol;
use crate::traits::{
    HasAromaticity, HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount, HasIsotope,
};

pub(crate) struct Fnv1aHasher(u64);

impl Fnv1aHasher {
    pub(crate) fn new() -> Self {
        Self(0xcbf29ce484222325)
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(0x100000001b3);
        }
    }
}

pub(crate) fn fnv_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut h = Fnv1aHasher::new();
    value.hash(&mut h);
    h.finish()
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct AtomInvariant {
    atomic_num: u8,
    degree: u8,
    hydrogen_count: u8,
    formal_charge: i8,
    is_aromatic: bool,
    isotope: u16,
    singles: u8,
    doubles: u8,
    triples: u8,
    aromatic_bonds: u8,
}

fn atom_invariant<A, B>(mol: &Mol<A, B>, idx: NodeIndex) -> AtomInvariant
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge + HasAromaticity + HasIsotope,
    B: HasBondOrder + HasAromaticity,
{
    let atom = mol.atom(idx);
    let mut inv = AtomInvariant {
        atomic_num: atom.atomic_num(),
        degree: mol.degree(idx) as u8,
        hydrogen_count: atom.hydrogen_count(),
        formal_charge: atom.formal_charge(),
        is_aromatic: atom.is_aromatic(),
        isotope: atom.isotope(),
        singles: 0,
        doubles: 0,
        triples: 0,
        aromatic_bonds: 0,
    };
    for edge in mol.bonds_of(idx) {
        let bond = mol.bond(edge);
        if bond.is_aromatic() {
            inv.aromatic_bonds += 1;
            continue;
        }
        match bond.bond_order() {
            crate::bond::BondOrder::Single => inv.singles += 1,
            crate::bond::BondOrder::Double => inv.doubles += 1,
            crate::bond::BondOrder::Triple => inv.triples += 1,
        }
    }
    inv
}

/// Bond key used during refinement: aromatic bonds hash apart from their
/// Kekulé order so alternate Kekulé forms rank identically.
fn bond_key(bond: &Bond) -> u64 {
    if bond.is_aromatic {
        4
    } else {
        bond.order.valence() as u64
    }
}

/// Canonical ranks for a perceived molecule.
pub fn canonical_ordering(mol: &Mol<Atom, Bond>) -> Vec<usize> {
    canonical_ranks(
        mol,
        |node| fnv_hash(&atom_invariant(mol, node)),
        |edge| bond_key(mol.bond(edge)),
    )
}

/// Rank atoms `0..n` from arbitrary invariants.
///
/// `atom_key` and `bond_key` must depend only on the payloads, not on
/// indices, for the result to be canonical.
pub fn canonical_ranks<A, B>(
    mol: &Mol<A, B>,
    atom_key: impl Fn(NodeIndex) -> u64,
    bond_key: impl Fn(EdgeIndex) -> u64,
) -> Vec<usize> {
    let n = mol.atom_count();
    if n == 0 {
        return Vec::new();
    }

    let invariants: Vec<u64> = mol.atoms().map(&atom_key).collect();
    let neighbors = neighbor_table(mol, &bond_key);

    let mut ranks = ranks_from_values(&invariants);
    morgan_refine(&neighbors, &mut ranks);

    if count_distinct(&ranks) < n {
        break_ties(&neighbors, &mut ranks, &invariants);
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by_key(|&i| ranks[i]);
    let mut final_ranks = vec![0usize; n];
    for (rank, &atom_idx) in indices.iter().enumerate() {
        final_ranks[atom_idx] = rank;
    }
    final_ranks
}

type NeighborTable = Vec<Vec<(usize, u64)>>;

fn neighbor_table<A, B>(mol: &Mol<A, B>, bond_key: &impl Fn(EdgeIndex) -> u64) -> NeighborTable {
    mol.atoms()
        .map(|node| {
            mol.bonds_of(node)
                .filter_map(|edge| {
                    let (a, b) = mol.bond_endpoints(edge)?;
                    let other = if a == node { b } else { a };
                    Some((other.index(), bond_key(edge)))
                })
                .collect()
        })
        .collect()
}

fn ranks_from_values(values: &[u64]) -> Vec<usize> {
    let n = values.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by_key(|&i| values[i]);
    let mut ranks = vec![0usize; n];
    for i in 1..n {
        ranks[indices[i]] = if values[indices[i]] == values[indices[i - 1]] {
            ranks[indices[i - 1]]
        } else {
            i
        };
    }
    ranks
}

fn count_distinct(ranks: &[usize]) -> usize {
    let mut sorted: Vec<usize> = ranks.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

fn neighborhood(neighbors: &NeighborTable, ranks: &[usize], i: usize) -> Vec<(usize, u64)> {
    let mut env: Vec<(usize, u64)> = neighbors[i]
        .iter()
        .map(|&(nb, key)| (ranks[nb], key))
        .collect();
    env.sort_unstable();
    env
}

fn morgan_refine(neighbors: &NeighborTable, ranks: &mut Vec<usize>) {
    let mut prev_distinct = count_distinct(ranks);

    loop {
        let new_values: Vec<u64> = (0..ranks.len())
            .map(|i| fnv_hash(&(ranks[i], neighborhood(neighbors, ranks, i))))
            .collect();
        let new_ranks = ranks_from_values(&new_values);
        let distinct = count_distinct(&new_ranks);
        if distinct <= prev_distinct {
            return;
        }
        *ranks = new_ranks;
        prev_distinct = distinct;
    }
}

fn break_ties(neighbors: &NeighborTable, ranks: &mut Vec<usize>, invariants: &[u64]) {
    let n = ranks.len();

    while count_distinct(ranks) < n {
        let Some(tied_rank) = lowest_tied_rank(ranks) else {
            return;
        };
        let max_rank = ranks.iter().copied().max().unwrap_or(0);

        let mut best: Option<(Vec<u64>, Vec<usize>)> = None;
        for candidate in (0..n).filter(|&i| ranks[i] == tied_rank) {
            let mut trial = ranks.clone();
            trial[candidate] = max_rank + 1;
            morgan_refine(neighbors, &mut trial);

            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by_key(|&i| trial[i]);
            let trace: Vec<u64> = order
                .iter()
                .map(|&i| fnv_hash(&(invariants[i], neighborhood(neighbors, &trial, i))))
                .collect();

            if best.as_ref().is_none_or(|(best_trace, _)| trace < *best_trace) {
                best = Some((trace, trial));
            }
        }

        match best {
            Some((_, trial)) => *ranks = trial,
            None => return,
        }
    }
}

fn lowest_tied_rank(ranks: &[usize]) -> Option<usize> {
    let mut sorted = ranks.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).find(|w| w[0] == w[1]).map(|w| w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::from_smiles;

    fn mol(smiles: &str) -> Mol<Atom, Bond> {
        from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
    }

    fn is_permutation(ranks: &[usize]) -> bool {
        let mut sorted = ranks.to_vec();
        sorted.sort_unstable();
        sorted.iter().enumerate().all(|(i, &r)| i == r)
    }

    #[test]
    fn empty_mol() {
        let m: Mol<Atom, Bond> = Mol::new();
        assert!(canonical_ordering(&m).is_empty());
    }

    #[test]
    fn single_atom() {
        assert_eq!(canonical_ordering(&mol("C")), vec![0]);
    }

    #[test]
    fn ethanol_all_distinct() {
        let ranks = canonical_ordering(&mol("CCO"));
        assert!(is_permutation(&ranks));
    }

    #[test]
    fn benzene_total_ordering() {
        let ranks = canonical_ordering(&mol("c1ccccc1"));
        assert_eq!(ranks.len(), 6);
        assert!(is_permutation(&ranks));
    }

    #[test]
    fn symmetric_atoms_share_invariants_before_tie_break() {
        let m = mol("OCC(C)C");
        let invariants: Vec<u64> = m.atoms().map(|a| fnv_hash(&atom_invariant(&m, a))).collect();
        assert_eq!(invariants[3], invariants[4]);
        assert_ne!(invariants[0], invariants[3]);
    }

    #[test]
    fn ranks_follow_atoms_under_renumbering() {
        let a = mol("OCC(=O)N");
        let b = mol("NC(=O)CO");
        let ra = canonical_ordering(&a);
        let rb = canonical_ordering(&b);
        // a: O0 C1 C2 O3 N4; b: N0 C1 O2 C3 O4
        assert_eq!(ra[0], rb[4]);
        assert_eq!(ra[1], rb[3]);
        assert_eq!(ra[2], rb[1]);
        assert_eq!(ra[3], rb[2]);
        assert_eq!(ra[4], rb[0]);
    }

    #[test]
    fn custom_keys_rank_generic_graphs() {
        let mut m: Mol<&str, ()> = Mol::new();
        let a = m.add_atom("x");
        let b = m.add_atom("y");
        let c = m.add_atom("x");
        m.add_bond(a, b, ());
        m.add_bond(b, c, ());
        let ranks = canonical_ranks(&m, |n| fnv_hash(*m.atom(n)), |_| 0);
        assert!(is_permutation(&ranks));
        assert_ne!(ranks[1], ranks[0]);
    }
}
