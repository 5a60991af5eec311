mod builder;
pub mod error;
mod parse_tree;
mod tokenizer;
mod writer;

use crate::aromaticity;
use crate::atom::Atom;
use crate::bond::{Bond, SmilesBond};
use crate::element::allowed_valences;
use crate::kekulize;
use crate::mol::Mol;
pub use builder::assign_implicit_hydrogens;
pub(crate) use builder::{bond_order_sum, implicit_hydrogens};
pub use error::SmilesError;
pub use writer::{to_canonical_smiles, to_smiles};
pub(crate) use writer::write_components;

/// Split a SMILES string at the first whitespace. The second half is
/// returned only when it is a `|...|` extension block.
pub fn split_cx(s: &str) -> (&str, Option<&str>) {
    let trimmed = s.trim();
    match trimmed.find(char::is_whitespace) {
        Some(pos) => {
            let rest = trimmed[pos..].trim_start();
            (&trimmed[..pos], rest.starts_with('|').then_some(rest))
        }
        None => (trimmed, None),
    }
}

/// Parse to the raw graph: written bonds, aromatic flags from lowercase
/// atoms, implicit hydrogens assigned. Text after the first whitespace is
/// not read.
pub fn parse_smiles(s: &str) -> Result<Mol<Atom, SmilesBond>, SmilesError> {
    let (head, _) = split_cx(s);
    if head.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    let tokens = tokenizer::tokenize(head)?;
    if tokens.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    let tree = parse_tree::build_parse_tree(&tokens)?;
    let mut mol = builder::build_mol(&tree);
    assign_implicit_hydrogens(&mut mol);
    Ok(mol)
}

/// Turn a raw graph into a perceived molecule: refresh implicit
/// hydrogens, kekulize, perceive aromaticity.
pub fn finalize(mut raw: Mol<Atom, SmilesBond>) -> Result<Mol<Atom, Bond>, SmilesError> {
    assign_implicit_hydrogens(&mut raw);
    let mut mol = kekulize::kekulize(&raw)?;
    check_valences(&mol)?;
    aromaticity::perceive(&mut mol);
    Ok(mol)
}

/// Reject an atom whose bonds and hydrogens exceed every valence its
/// element and charge allow. Atoms without a valence table pass.
fn check_valences(mol: &Mol<Atom, Bond>) -> Result<(), SmilesError> {
    for idx in mol.atoms() {
        let atom = mol.atom(idx);
        let allowed = allowed_valences(atom.atomic_num, atom.formal_charge);
        let used: u16 = mol
            .bonds_of(idx)
            .map(|e| mol.bond(e).order.valence() as u16)
            .sum::<u16>()
            + atom.hydrogen_count as u16;
        if !allowed.is_empty() && allowed.iter().all(|&v| (v as u16) < used) {
            return Err(SmilesError::Valence {
                atom: idx.index(),
                atomic_num: atom.atomic_num,
                valence: used.min(u8::MAX as u16) as u8,
            });
        }
    }
    Ok(())
}

pub fn from_smiles(s: &str) -> Result<Mol<Atom, Bond>, SmilesError> {
    finalize(parse_smiles(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::{BondOrder, SmilesBondOrder};
    use petgraph::graph::NodeIndex;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    fn raw(smiles: &str) -> Mol<Atom, SmilesBond> {
        parse_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
    }

    fn atom(mol: &Mol<Atom, SmilesBond>, i: usize) -> &Atom {
        mol.atom(n(i))
    }

    // --- Simple molecules ---

    #[test]
    fn methane() {
        let mol = raw("C");
        assert_eq!(mol.atom_count(), 1);
        assert_eq!(mol.bond_count(), 0);
        assert_eq!(atom(&mol, 0).atomic_num, 6);
        assert_eq!(atom(&mol, 0).hydrogen_count, 4);
    }

    #[test]
    fn ethyne() {
        let mol = raw("C#C");
        assert_eq!(atom(&mol, 0).hydrogen_count, 1);
        let edge = mol.bond_between(n(0), n(1)).unwrap();
        assert_eq!(mol.bond(edge).order, SmilesBondOrder::Triple);
    }

    #[test]
    fn acetic_acid() {
        let mol = raw("CC(=O)O");
        assert_eq!(mol.atom_count(), 4);
        assert_eq!(atom(&mol, 0).hydrogen_count, 3);
        assert_eq!(atom(&mol, 1).hydrogen_count, 0);
        assert_eq!(atom(&mol, 2).hydrogen_count, 0);
        assert_eq!(atom(&mol, 3).hydrogen_count, 1);
    }

    #[test]
    fn halides() {
        for (smiles, z) in [("F", 9), ("Cl", 17), ("Br", 35), ("I", 53)] {
            let mol = raw(smiles);
            assert_eq!(atom(&mol, 0).atomic_num, z);
            assert_eq!(atom(&mol, 0).hydrogen_count, 1, "{smiles}");
        }
    }

    // --- Branches and rings ---

    #[test]
    fn neopentane() {
        let mol = raw("CC(C)(C)C");
        assert_eq!(mol.bond_count(), 4);
        assert_eq!(atom(&mol, 1).hydrogen_count, 0);
    }

    #[test]
    fn multi_digit_ring() {
        let mol = raw("C%10CC%10");
        assert_eq!(mol.atom_count(), 3);
        assert_eq!(mol.bond_count(), 3);
    }

    #[test]
    fn bicyclo() {
        let mol = raw("C1CC2C1CC2");
        assert_eq!(mol.atom_count(), 6);
        assert_eq!(mol.bond_count(), 7);
    }

    // --- Bracket atoms ---

    #[test]
    fn charges_and_isotopes() {
        let mol = raw("[NH4+]");
        assert_eq!(atom(&mol, 0).formal_charge, 1);
        assert_eq!(atom(&mol, 0).hydrogen_count, 4);
        assert_eq!(atom(&raw("[O-]"), 0).formal_charge, -1);
        assert_eq!(atom(&raw("[13C]"), 0).isotope, 13);
        assert_eq!(atom(&raw("[2H]"), 0).atomic_num, 1);
        assert_eq!(atom(&raw("[Fe]"), 0).atomic_num, 26);
    }

    #[test]
    fn atom_class_becomes_map() {
        let mol = raw("[CH3:12]O");
        assert_eq!(atom(&mol, 0).map_num, 12);
        assert_eq!(atom(&mol, 1).map_num, 0);
    }

    #[test]
    fn stereo_marks_are_read_and_dropped() {
        let mol = raw("N[C@@H](C)C(=O)O");
        assert_eq!(atom(&mol, 1).hydrogen_count, 1);
        let mol = raw(r"F/C=C\F");
        assert_eq!(mol.bond_count(), 3);
        let e = mol.bond_between(n(0), n(1)).unwrap();
        assert_eq!(mol.bond(e).order, SmilesBondOrder::Single);
    }

    // --- Aromatic input ---

    #[test]
    fn pyridine_raw() {
        let mol = raw("c1ccncc1");
        assert_eq!(atom(&mol, 3).hydrogen_count, 0);
        for i in [0, 1, 2, 4, 5] {
            assert_eq!(atom(&mol, i).hydrogen_count, 1);
        }
    }

    #[test]
    fn phenol_link_is_single() {
        let mol = raw("Oc1ccccc1");
        assert_eq!(atom(&mol, 0).hydrogen_count, 1);
        let e = mol.bond_between(n(0), n(1)).unwrap();
        assert_eq!(mol.bond(e).order, SmilesBondOrder::Single);
    }

    #[test]
    fn caffeine_finalizes() {
        let mol = from_smiles("Cn1cnc2c1c(=O)n(c(=O)n2C)C").unwrap();
        assert_eq!(mol.atom_count(), 14);
    }

    // --- Finalize ---

    #[test]
    fn finalize_perceives_kekule_benzene() {
        let mol = from_smiles("C1=CC=CC=C1").unwrap();
        assert!(mol.atoms().all(|a| mol.atom(a).is_aromatic));
        let doubles = mol
            .bonds()
            .filter(|&e| mol.bond(e).order == BondOrder::Double)
            .count();
        assert_eq!(doubles, 3);
    }

    #[test]
    fn finalize_refreshes_hydrogens_after_edit() {
        let mut mol = raw("CC");
        let extra = mol.add_atom(Atom {
            atomic_num: 8,
            ..Atom::default()
        });
        mol.add_bond(n(1), extra, SmilesBond::default());
        let mol = finalize(mol).unwrap();
        assert_eq!(mol.atom(n(1)).hydrogen_count, 2);
        assert_eq!(mol.atom(extra).hydrogen_count, 1);
    }

    #[test]
    fn unkekulizable_is_an_error() {
        assert!(matches!(
            from_smiles("c1cccc1"),
            Err(SmilesError::Kekulize(_))
        ));
    }

    #[test]
    fn overvalent_atoms_are_rejected() {
        for bad in ["CC(C)(C)(C)(C)C", "CO(C)C", "CN(C)(C)C", "[CH5]", "FF(F)"] {
            assert!(
                matches!(from_smiles(bad), Err(SmilesError::Valence { .. })),
                "{bad:?} should fail"
            );
        }
        assert!(matches!(
            from_smiles("CO(C)C"),
            Err(SmilesError::Valence {
                atom: 1,
                atomic_num: 8,
                valence: 3
            })
        ));
    }

    #[test]
    fn allowed_valences_pass() {
        for good in [
            "[NH4+]",
            "C[N+](C)(C)C",
            "CS(=O)(=O)C",
            "[O-][N+](=O)c1ccccc1",
            "[O-][n+]1ccccc1",
            "[C-]#[O+]",
            "OP(=O)(O)O",
            "[Na+].[Cl-]",
            "*C",
        ] {
            assert!(from_smiles(good).is_ok(), "{good:?} should parse");
        }
    }

    // --- Extension block ---

    #[test]
    fn split_cx_block() {
        assert_eq!(split_cx("OCO |LN:1:1.2|"), ("OCO", Some("|LN:1:1.2|")));
        assert_eq!(split_cx("  CCO  "), ("CCO", None));
        assert_eq!(split_cx("CCO ethanol"), ("CCO", None));
    }

    #[test]
    fn parse_ignores_cx_block() {
        let mol = raw("OCO |LN:1:1.2|");
        assert_eq!(mol.atom_count(), 3);
    }

    // --- Errors ---

    #[test]
    fn error_cases() {
        for bad in ["", "   ", "C(C", "C)C", "C1CC", "X", "[C", "C$C", "INVALID_SMILES"] {
            assert!(parse_smiles(bad).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn round_trip_through_writer() {
        let mol = from_smiles("OC(=O)c1ccccc1").unwrap();
        let again = from_smiles(&to_canonical_smiles(&mol)).unwrap();
        assert_eq!(to_canonical_smiles(&mol), to_canonical_smiles(&again));
    }
}
