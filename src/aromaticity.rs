//! Aromaticity perception on Kekulé structures.
//!
//! Each SSSR ring, and each union of two rings fused through a single
//! shared bond, is tested with Hückel's 4n+2 rule. Atoms contribute pi
//! electrons according to their local bonding; any atom that cannot
//! take part in a delocalized system disqualifies the whole ring.

use std::collections::BTreeSet;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;
use crate::rings::{ring_edges_of, RingInfo};
use crate::traits::{HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount};

/// Elements that can be sp2-hybridized in an aromatic ring.
const SP2_CAPABLE: &[u8] = &[5, 6, 7, 8, 15, 16, 33, 34, 52];

/// A candidate aromatic system: its atoms and the bonds that close it.
#[derive(Debug, Clone)]
struct RingSystem {
    atoms: BTreeSet<NodeIndex>,
    edges: BTreeSet<EdgeIndex>,
}

/// Per-atom aromatic flags for a Kekulé molecule.
pub fn find_aromatic_atoms<A, B>(mol: &Mol<A, B>) -> Vec<bool>
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let (atoms, _) = aromatic_flags(mol);
    atoms
}

/// Mark aromatic atoms and bonds in place. Existing flags are overwritten.
pub fn perceive(mol: &mut Mol<Atom, Bond>) {
    let (atoms, bonds) = aromatic_flags(mol);
    for node in mol.atoms().collect::<Vec<_>>() {
        mol.atom_mut(node).is_aromatic = atoms[node.index()];
    }
    for edge in mol.bonds().collect::<Vec<_>>() {
        mol.bond_mut(edge).is_aromatic = bonds[edge.index()];
    }
}

fn aromatic_flags<A, B>(mol: &Mol<A, B>) -> (Vec<bool>, Vec<bool>)
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let mut atoms = vec![false; mol.atom_count()];
    let mut bonds = vec![false; mol.bond_count()];

    let ring_info = RingInfo::sssr(mol);
    if ring_info.num_rings() == 0 {
        return (atoms, bonds);
    }

    for system in candidate_systems(mol, &ring_info) {
        if !is_aromatic_system(mol, &ring_info, &system) {
            continue;
        }
        for atom in &system.atoms {
            atoms[atom.index()] = true;
        }
        for edge in &system.edges {
            bonds[edge.index()] = true;
        }
    }

    (atoms, bonds)
}

fn candidate_systems<A, B>(mol: &Mol<A, B>, ring_info: &RingInfo) -> Vec<RingSystem> {
    let singles: Vec<RingSystem> = ring_info
        .rings()
        .iter()
        .map(|ring| RingSystem {
            atoms: ring.iter().copied().collect(),
            edges: ring_edges_of(ring, mol).into_iter().collect(),
        })
        .collect();

    let mut systems = singles.clone();
    for (i, a) in singles.iter().enumerate() {
        for b in &singles[i + 1..] {
            if a.edges.intersection(&b.edges).count() != 1 {
                continue;
            }
            systems.push(RingSystem {
                atoms: a.atoms.union(&b.atoms).copied().collect(),
                edges: a.edges.union(&b.edges).copied().collect(),
            });
        }
    }
    systems
}

fn is_aromatic_system<A, B>(mol: &Mol<A, B>, ring_info: &RingInfo, system: &RingSystem) -> bool
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let mut total = 0u32;
    for &atom in &system.atoms {
        match pi_electrons(mol, ring_info, atom) {
            Some(e) => total += e as u32,
            None => return false,
        }
    }
    is_huckel(total)
}

/// Pi electrons an atom donates to a ring, or `None` if it cannot be part
/// of an aromatic system.
fn pi_electrons<A, B>(mol: &Mol<A, B>, ring_info: &RingInfo, atom: NodeIndex) -> Option<u8>
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let data = mol.atom(atom);
    let z = data.atomic_num();
    if !SP2_CAPABLE.contains(&z) {
        return None;
    }
    let charge = data.formal_charge();
    let connections = mol.degree(atom) + data.hydrogen_count() as usize;

    let mut double = None;
    for edge in mol.bonds_of(atom) {
        match mol.bond(edge).bond_order() {
            BondOrder::Triple => return None,
            BondOrder::Double if double.is_some() => return None,
            BondOrder::Double => double = Some(edge),
            BondOrder::Single => {}
        }
    }

    if let Some(edge) = double {
        if ring_info.is_ring_bond(edge) {
            return Some(1);
        }
        let (a, b) = mol.bond_endpoints(edge)?;
        let partner = if a == atom { b } else { a };
        let partner_z = mol.atom(partner).atomic_num();
        return (z == 6 && matches!(partner_z, 7 | 8 | 16)).then_some(0);
    }

    if connections > 3 {
        return None;
    }
    match (z, charge) {
        (5, 0) => Some(0),
        (6, -1) => Some(2),
        (6, 1) => Some(0),
        (7 | 15 | 33, 0) if connections == 3 => Some(2),
        (7 | 15 | 33, -1) if connections == 2 => Some(2),
        (8 | 16 | 34 | 52, 0) if connections == 2 => Some(2),
        _ => None,
    }
}

fn is_huckel(electrons: u32) -> bool {
    electrons >= 2 && (electrons - 2) % 4 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::from_smiles;

    fn mol(smiles: &str) -> Mol<Atom, Bond> {
        from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
    }

    fn all_aromatic(smiles: &str) -> bool {
        let m = mol(smiles);
        let result = m.atoms().all(|a| m.atom(a).is_aromatic);
        result
    }

    fn none_aromatic(smiles: &str) -> bool {
        let m = mol(smiles);
        let result = m.atoms().all(|a| !m.atom(a).is_aromatic);
        result
    }

    // --- Six-membered rings ---

    #[test]
    fn benzene_from_kekule() {
        assert!(all_aromatic("C1=CC=CC=C1"));
        let m = mol("C1=CC=CC=C1");
        assert!(m.bonds().all(|e| m.bond(e).is_aromatic));
    }

    #[test]
    fn pyridine() {
        assert!(all_aromatic("c1ccncc1"));
    }

    #[test]
    fn cyclohexane_is_not() {
        assert!(none_aromatic("C1CCCCC1"));
        assert!(none_aromatic("C1=CCCCC1"));
    }

    #[test]
    fn quinone_is_not() {
        assert!(none_aromatic("O=C1C=CC(=O)C=C1"));
    }

    // --- Five-membered heteroaromatics ---

    #[test]
    fn pyrrole_furan_thiophene() {
        assert!(all_aromatic("[nH]1cccc1"));
        assert!(all_aromatic("o1cccc1"));
        assert!(all_aromatic("s1cccc1"));
        assert!(all_aromatic("C1=CNC=C1"));
    }

    #[test]
    fn cyclopentadienyl_anion() {
        assert!(all_aromatic("[C-]1=CC=CC=1"));
        assert!(none_aromatic("C1=CCC=C1"));
    }

    // --- Exocyclic bonds ---

    #[test]
    fn pyridone_ring_is_aromatic() {
        let m = mol("O=C1C=CC=CN1");
        assert!(!m.atom(NodeIndex::new(0)).is_aromatic);
        for i in 1..7 {
            assert!(m.atom(NodeIndex::new(i)).is_aromatic, "atom {i}");
        }
        let exo = m.bond_between(NodeIndex::new(0), NodeIndex::new(1)).unwrap();
        assert!(!m.bond(exo).is_aromatic);
        assert_eq!(m.bond(exo).order, BondOrder::Double);
    }

    #[test]
    fn substituent_stays_aliphatic() {
        let m = mol("Oc1ccccc1");
        assert!(!m.atom(NodeIndex::new(0)).is_aromatic);
        let e = m.bond_between(NodeIndex::new(0), NodeIndex::new(1)).unwrap();
        assert!(!m.bond(e).is_aromatic);
    }

    #[test]
    fn methylene_exocyclic_is_not() {
        assert!(none_aromatic("C=C1C=CC=C1"));
    }

    // --- Fused systems ---

    #[test]
    fn naphthalene_and_indole() {
        assert!(all_aromatic("c1ccc2ccccc2c1"));
        assert!(all_aromatic("c1ccc2[nH]ccc2c1"));
    }

    #[test]
    fn azulene_through_fused_union() {
        assert!(all_aromatic("C1=CC2=CC=CC=CC2=C1"));
    }

    #[test]
    fn cyclooctatetraene_is_not() {
        assert!(none_aromatic("C1=CC=CC=CC=C1"));
    }

    #[test]
    fn generic_flags_match_perception() {
        let m = mol("Cc1ccccc1");
        let flags = find_aromatic_atoms(&m);
        assert!(!flags[0]);
        assert!(flags[1..].iter().all(|&f| f));
    }

    #[test]
    fn huckel_rule() {
        assert!(!is_huckel(0));
        assert!(is_huckel(2));
        assert!(!is_huckel(4));
        assert!(is_huckel(6));
        assert!(!is_huckel(8));
        assert!(is_huckel(10));
        assert!(is_huckel(14));
    }
}
