//! Kekulization assigns alternating single and double bonds to aromatic systems.
//!
//! The input is a `Mol<Atom, SmilesBond>` whose aromatic bonds come from
//! lowercase SMILES atoms or from reaction products that created aromatic
//! bonds. The output is a `Mol<Atom, Bond>` with concrete single/double
//! bonds. Implemented via augmenting-path matching over the atoms that
//! still have a free valence.
//!
//! If no valid assignment exists (e.g. `c1cccc1`), [`kekulize`] returns a
//! [`KekulizeError`].

use std::collections::{HashSet, VecDeque};
use std::fmt;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder, SmilesBond, SmilesBondOrder};
use crate::element::{charged_valences, Element};
use crate::mol::Mol;
use crate::smiles::bond_order_sum;

/// Error returned when no valid Kekulé structure exists.
///
/// Contains the atoms that could not be assigned a double bond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KekulizeError {
    Unkekulizable(Vec<NodeIndex>),
}

impl fmt::Display for KekulizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unkekulizable(atoms) => {
                let list: Vec<String> = atoms.iter().map(|a| a.index().to_string()).collect();
                write!(
                    f,
                    "cannot kekulize aromatic system: unmatched atoms [{}]",
                    list.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for KekulizeError {}

type Adjacency = Vec<Vec<(NodeIndex, EdgeIndex)>>;

/// Convert a molecule with aromatic bonds into one with explicit Kekulé bonds.
///
/// Every atom that needs a double bond receives exactly one from its
/// aromatic bonds; all other aromatic bonds become single. Atom payloads
/// (including `is_aromatic`) are copied unchanged; aromaticity is
/// re-derived afterwards by [`crate::aromaticity::perceive`].
pub fn kekulize(mol: &Mol<Atom, SmilesBond>) -> Result<Mol<Atom, Bond>, KekulizeError> {
    let n = mol.atom_count();

    let mut aromatic_adj: Adjacency = vec![vec![]; n];
    for e in mol.bonds() {
        if mol.bond(e).order != SmilesBondOrder::Aromatic {
            continue;
        }
        if let Some((a, b)) = mol.bond_endpoints(e) {
            aromatic_adj[a.index()].push((b, e));
            aromatic_adj[b.index()].push((a, e));
        }
    }

    let needs_double: Vec<bool> = mol
        .atoms()
        .map(|node| !aromatic_adj[node.index()].is_empty() && needs_double_bond(mol, node))
        .collect();

    let mut matched_edge: Vec<Option<EdgeIndex>> = vec![None; n];
    let mut unmatched = Vec::new();

    for start in mol.atoms() {
        if !needs_double[start.index()] || matched_edge[start.index()].is_some() {
            continue;
        }
        if !augment(mol, &aromatic_adj, &needs_double, &mut matched_edge, start) {
            unmatched.push(start);
        }
    }

    if !unmatched.is_empty() {
        return Err(KekulizeError::Unkekulizable(unmatched));
    }

    let doubles: HashSet<EdgeIndex> = matched_edge.iter().filter_map(|e| *e).collect();

    Ok(mol.map_bonds(|edge, bond| {
        let order = match bond.order {
            SmilesBondOrder::Aromatic if doubles.contains(&edge) => BondOrder::Double,
            SmilesBondOrder::Aromatic | SmilesBondOrder::Single => BondOrder::Single,
            SmilesBondOrder::Double => BondOrder::Double,
            SmilesBondOrder::Triple => BondOrder::Triple,
        };
        Bond::new(order)
    }))
}

/// An atom needs a double bond when its lowest fitting valence leaves at
/// least one unit free after sigma bonds and hydrogens.
fn needs_double_bond(mol: &Mol<Atom, SmilesBond>, node: NodeIndex) -> bool {
    let atom = mol.atom(node);
    let used = bond_order_sum(mol, node).saturating_add(atom.hydrogen_count);
    let valences = if atom.formal_charge == 0 {
        Element::from_atomic_num(atom.atomic_num)
            .map(|e| e.default_valences().to_vec())
            .unwrap_or_default()
    } else {
        charged_valences(atom.atomic_num, atom.formal_charge)
    };
    valences
        .into_iter()
        .find(|&v| v >= used)
        .is_some_and(|v| v > used)
}

fn augment(
    mol: &Mol<Atom, SmilesBond>,
    aromatic_adj: &Adjacency,
    needs_double: &[bool],
    matched_edge: &mut [Option<EdgeIndex>],
    start: NodeIndex,
) -> bool {
    let n = mol.atom_count();
    let mut prev: Vec<Option<(NodeIndex, EdgeIndex)>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();

    visited[start.index()] = true;
    queue.push_back(start);

    while let Some(u) = queue.pop_front() {
        for &(v, e) in &aromatic_adj[u.index()] {
            if !needs_double[v.index()] || visited[v.index()] {
                continue;
            }
            if Some(e) == matched_edge[u.index()] {
                continue;
            }
            visited[v.index()] = true;
            prev[v.index()] = Some((u, e));

            let Some(matched_e) = matched_edge[v.index()] else {
                flip_path(matched_edge, &prev, start, v);
                return true;
            };
            let Some((ea, eb)) = mol.bond_endpoints(matched_e) else {
                continue;
            };
            let w = if ea == v { eb } else { ea };

            if !visited[w.index()] {
                visited[w.index()] = true;
                prev[w.index()] = Some((v, matched_e));
                queue.push_back(w);
            }
        }
    }
    false
}

fn flip_path(
    matched_edge: &mut [Option<EdgeIndex>],
    prev: &[Option<(NodeIndex, EdgeIndex)>],
    start: NodeIndex,
    end: NodeIndex,
) {
    let mut cur = end;
    let mut is_new_match = true;
    while cur != start {
        let Some((p, e)) = prev[cur.index()] else {
            break;
        };
        if is_new_match {
            matched_edge[cur.index()] = Some(e);
            matched_edge[p.index()] = Some(e);
        }
        is_new_match = !is_new_match;
        cur = p;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    fn kek(smiles: &str) -> Result<Mol<Atom, Bond>, KekulizeError> {
        let raw = parse_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"));
        kekulize(&raw)
    }

    fn count_double_bonds(mol: &Mol<Atom, Bond>) -> usize {
        mol.bonds()
            .filter(|&e| mol.bond(e).order == BondOrder::Double)
            .count()
    }

    fn is_valid_kekulization(mol: &Mol<Atom, Bond>) -> bool {
        mol.atoms().all(|node| {
            mol.bonds_of(node)
                .filter(|&e| mol.bond(e).order == BondOrder::Double)
                .count()
                <= 1
                || !mol.atom(node).is_aromatic
        })
    }

    #[test]
    fn benzene() {
        let mol = kek("c1ccccc1").unwrap();
        assert_eq!(mol.bond_count(), 6);
        assert_eq!(count_double_bonds(&mol), 3);
        assert!(is_valid_kekulization(&mol));
        for node in mol.atoms() {
            assert_eq!(mol.atom(node).hydrogen_count, 1);
        }
    }

    #[test]
    fn naphthalene() {
        let mol = kek("c1ccc2ccccc2c1").unwrap();
        assert_eq!(mol.bond_count(), 11);
        assert_eq!(count_double_bonds(&mol), 5);
        assert!(is_valid_kekulization(&mol));
    }

    #[test]
    fn anthracene() {
        let mol = kek("c1ccc2cc3ccccc3cc2c1").unwrap();
        assert_eq!(count_double_bonds(&mol), 7);
        assert!(is_valid_kekulization(&mol));
    }

    #[test]
    fn pyridine() {
        let mol = kek("c1ccncc1").unwrap();
        assert_eq!(count_double_bonds(&mol), 3);
        assert_eq!(mol.atom(n(3)).hydrogen_count, 0);
    }

    #[test]
    fn five_membered_heteroaromatics() {
        for smiles in ["[nH]1cccc1", "o1cccc1", "s1cccc1", "c1c[nH]cn1", "[cH-]1cccc1"] {
            let mol = kek(smiles).unwrap_or_else(|e| panic!("{smiles}: {e}"));
            assert_eq!(count_double_bonds(&mol), 2, "{smiles}");
            assert!(is_valid_kekulization(&mol), "{smiles}");
        }
    }

    #[test]
    fn pyridone_exocyclic_carbonyl() {
        let mol = kek("O=c1cccc[nH]1").unwrap();
        let co = mol.bond_between(n(0), n(1)).unwrap();
        assert_eq!(mol.bond(co).order, BondOrder::Double);
        assert_eq!(count_double_bonds(&mol), 3);
    }

    #[test]
    fn charged_rings() {
        for smiles in ["[n+]1ccccc1", "C[n+]1ccccc1", "c1cc[nH+]cc1", "c1ccc2[nH+]cccc2c1"] {
            let mol = kek(smiles).unwrap_or_else(|e| panic!("{smiles}: {e}"));
            assert!(is_valid_kekulization(&mol), "{smiles}");
        }
        assert_eq!(count_double_bonds(&kek("C[n+]1cc[nH]c1").unwrap()), 2);
    }

    #[test]
    fn substituents_stay_single() {
        let mol = kek("Oc1ccccc1").unwrap();
        let bond_o_c = mol.bond_between(n(0), n(1)).unwrap();
        assert_eq!(mol.bond(bond_o_c).order, BondOrder::Single);
        assert_eq!(count_double_bonds(&mol), 3);
    }

    #[test]
    fn non_aromatic_passthrough() {
        let mol = kek("C=CC#N").unwrap();
        let e01 = mol.bond_between(n(0), n(1)).unwrap();
        assert_eq!(mol.bond(e01).order, BondOrder::Double);
        let e23 = mol.bond_between(n(2), n(3)).unwrap();
        assert_eq!(mol.bond(e23).order, BondOrder::Triple);
    }

    #[test]
    fn odd_ring_unkekulizable() {
        match kek("c1cccc1") {
            Err(KekulizeError::Unkekulizable(atoms)) => assert!(!atoms.is_empty()),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(kek("[c-]1cccc1").is_err());
    }

    #[test]
    fn error_display() {
        let err = KekulizeError::Unkekulizable(vec![n(0), n(2)]);
        assert_eq!(
            err.to_string(),
            "cannot kekulize aromatic system: unmatched atoms [0, 2]"
        );
    }
}
