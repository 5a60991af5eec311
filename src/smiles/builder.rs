use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{SmilesBond, SmilesBondOrder};
use crate::element::{charged_valences, Element};
use crate::mol::Mol;
use crate::smiles::parse_tree::ParseTree;
use crate::smiles::tokenizer::BondToken;

/// Build the raw graph. Bracket atoms get their written hydrogen count and
/// `no_implicit`; bare atoms are left at zero for [`assign_implicit_hydrogens`].
pub fn build_mol(tree: &ParseTree) -> Mol<Atom, SmilesBond> {
    let mut mol = Mol::new();
    let mut node_indices: Vec<NodeIndex> = Vec::with_capacity(tree.atoms.len());

    for parse_atom in &tree.atoms {
        let tok = &parse_atom.token;
        let atom = Atom {
            atomic_num: tok.atomic_num,
            formal_charge: tok.charge,
            isotope: tok.isotope,
            hydrogen_count: if tok.is_bracket {
                tok.hcount.unwrap_or(0)
            } else {
                0
            },
            is_aromatic: tok.is_aromatic,
            map_num: tok.atom_class,
            no_implicit: tok.is_bracket,
        };
        node_indices.push(mol.add_atom(atom));
    }

    for (i, parse_atom) in tree.atoms.iter().enumerate() {
        for neighbor in &parse_atom.neighbors {
            let j = neighbor.atom_idx;
            if j <= i || mol.bond_between(node_indices[i], node_indices[j]).is_some() {
                continue;
            }
            let order = resolve_bond_order(
                neighbor.bond,
                parse_atom.token.is_aromatic,
                tree.atoms[j].token.is_aromatic,
            );
            mol.add_bond(node_indices[i], node_indices[j], SmilesBond::new(order));
        }
    }

    mol
}

fn resolve_bond_order(
    bond_tok: Option<BondToken>,
    from_aromatic: bool,
    to_aromatic: bool,
) -> SmilesBondOrder {
    match bond_tok {
        Some(BondToken::Single) => SmilesBondOrder::Single,
        Some(BondToken::Double) => SmilesBondOrder::Double,
        Some(BondToken::Triple) => SmilesBondOrder::Triple,
        Some(BondToken::Aromatic) => SmilesBondOrder::Aromatic,
        None if from_aromatic && to_aromatic => SmilesBondOrder::Aromatic,
        None => SmilesBondOrder::Single,
    }
}

/// Sum of bond orders around `node`, counting aromatic bonds as 1.
pub(crate) fn bond_order_sum(mol: &Mol<Atom, SmilesBond>, node: NodeIndex) -> u8 {
    mol.bonds_of(node)
        .map(|e| match mol.bond(e).order {
            SmilesBondOrder::Single | SmilesBondOrder::Aromatic => 1u8,
            SmilesBondOrder::Double => 2,
            SmilesBondOrder::Triple => 3,
        })
        .fold(0u8, u8::saturating_add)
}

/// Hydrogens needed to bring an atom to its lowest fitting valence.
///
/// Aromatic atoms reserve one valence for the pi bond the kekulizer will
/// place, so `c` with two ring bonds gets one H and `n` gets none.
pub(crate) fn implicit_hydrogens(atomic_num: u8, charge: i8, bond_sum: u8, aromatic: bool) -> u8 {
    let valences = if charge == 0 {
        Element::from_atomic_num(atomic_num)
            .map(|e| e.default_valences().to_vec())
            .unwrap_or_default()
    } else {
        charged_valences(atomic_num, charge)
    };
    let Some(target) = valences.iter().copied().find(|&v| v >= bond_sum) else {
        return 0;
    };
    let free = target - bond_sum;
    if aromatic {
        free.saturating_sub(1)
    } else {
        free
    }
}

/// Fill in hydrogen counts for every atom not marked `no_implicit`.
pub fn assign_implicit_hydrogens(mol: &mut Mol<Atom, SmilesBond>) {
    let nodes: Vec<NodeIndex> = mol.atoms().collect();
    for node in nodes {
        if mol.atom(node).no_implicit {
            continue;
        }
        let sum = bond_order_sum(mol, node);
        let atom = mol.atom(node);
        let h = implicit_hydrogens(atom.atomic_num, atom.formal_charge, sum, atom.is_aromatic);
        mol.atom_mut(node).hydrogen_count = h;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_tree::build_parse_tree;
    use crate::smiles::tokenizer::tokenize;

    fn parse(s: &str) -> Mol<Atom, SmilesBond> {
        let tokens = tokenize(s).unwrap();
        let tree = build_parse_tree(&tokens).unwrap();
        let mut mol = build_mol(&tree);
        assign_implicit_hydrogens(&mut mol);
        mol
    }

    fn h(mol: &Mol<Atom, SmilesBond>, i: usize) -> u8 {
        mol.atom(NodeIndex::new(i)).hydrogen_count
    }

    #[test]
    fn methane_h_count() {
        let mol = parse("C");
        assert_eq!(mol.atom_count(), 1);
        assert_eq!(h(&mol, 0), 4);
    }

    #[test]
    fn ethene_h_counts() {
        let mol = parse("C=C");
        assert_eq!(h(&mol, 0), 2);
        assert_eq!(h(&mol, 1), 2);
    }

    #[test]
    fn hypervalent_sulfur_picks_next_valence() {
        let mol = parse("CS(=O)(=O)C");
        assert_eq!(h(&mol, 1), 0);
        let mol = parse("CS(=O)C");
        assert_eq!(h(&mol, 1), 0);
    }

    #[test]
    fn bracket_atom_h_is_explicit() {
        let mol = parse("[CH4]");
        assert_eq!(h(&mol, 0), 4);
        assert!(mol.atom(NodeIndex::new(0)).no_implicit);
        let mol = parse("[C]");
        assert_eq!(h(&mol, 0), 0);
    }

    #[test]
    fn atom_class_becomes_map_number() {
        let mol = parse("[CH3:4]O");
        assert_eq!(mol.atom(NodeIndex::new(0)).map_num, 4);
        assert_eq!(mol.atom(NodeIndex::new(1)).map_num, 0);
    }

    #[test]
    fn aromatic_carbon_benzene() {
        let mol = parse("c1ccccc1");
        for i in 0..6 {
            assert!(mol.atom(NodeIndex::new(i)).is_aromatic);
            assert_eq!(h(&mol, i), 1, "atom {i} should have 1 H");
        }
        assert!(mol
            .bonds()
            .all(|e| mol.bond(e).order == SmilesBondOrder::Aromatic));
    }

    #[test]
    fn pyridine_nitrogen_has_no_h() {
        let mol = parse("n1ccccc1");
        assert_eq!(h(&mol, 0), 0);
    }

    #[test]
    fn aromatic_to_aliphatic_bond_is_single() {
        let mol = parse("c1ccccc1C");
        let e = mol
            .bond_between(NodeIndex::new(5), NodeIndex::new(6))
            .unwrap();
        assert_eq!(mol.bond(e).order, SmilesBondOrder::Single);
        assert_eq!(h(&mol, 5), 0);
        assert_eq!(h(&mol, 6), 3);
    }

    #[test]
    fn charged_valence_lookup() {
        assert_eq!(implicit_hydrogens(7, 1, 0, false), 4);
        assert_eq!(implicit_hydrogens(8, -1, 1, false), 0);
        assert_eq!(implicit_hydrogens(0, 0, 1, false), 0);
    }
}
