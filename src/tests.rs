use crate::*;

fn mol(smiles: &str) -> Mol<Atom, Bond> {
    from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
}

// --- Graph container ---

#[test]
fn mol_add_atoms_and_bonds() {
    let mut m = Mol::<Atom, Bond>::new();
    let c = m.add_atom(Atom {
        atomic_num: 6,
        ..Atom::default()
    });
    let o = m.add_atom(Atom {
        atomic_num: 8,
        ..Atom::default()
    });
    let e = m.add_bond(c, o, Bond::new(BondOrder::Double));

    assert_eq!(m.atom_count(), 2);
    assert_eq!(m.bond_count(), 1);
    assert_eq!(m.bond(e).order, BondOrder::Double);
    assert_eq!(m.bond_between(o, c), Some(e));
    assert_eq!(m.neighbors(c).collect::<Vec<_>>(), vec![o]);
}

#[test]
fn mol_atom_mut() {
    let mut m = Mol::<Atom, Bond>::new();
    let idx = m.add_atom(Atom::default());
    m.atom_mut(idx).atomic_num = 7;
    assert_eq!(m.atom(idx).atomic_num, 7);
}

#[test]
fn map_atoms_keeps_bonds() {
    let m = mol("[CH3:1][OH:2]");
    let cleared = m.map_atoms(|_, a| {
        let mut a = a.clone();
        a.set_map_num(0);
        a
    });
    assert_eq!(cleared.bond_count(), 1);
    assert!(cleared.atoms().all(|i| cleared.atom(i).map_num == 0));
    assert!(m.atoms().any(|i| m.atom(i).map_num == 2));
}

// --- Atom and bond payloads ---

#[test]
fn atom_trait_impls() {
    let atom = Atom {
        atomic_num: 6,
        formal_charge: -1,
        isotope: 13,
        hydrogen_count: 3,
        is_aromatic: true,
        map_num: 4,
        no_implicit: true,
    };

    assert_eq!(HasAtomicNum::atomic_num(&atom), 6);
    assert_eq!(HasFormalCharge::formal_charge(&atom), -1);
    assert_eq!(HasIsotope::isotope(&atom), 13);
    assert_eq!(HasHydrogenCount::hydrogen_count(&atom), 3);
    assert!(HasAromaticity::is_aromatic(&atom));
    assert_eq!(HasAtomMap::map_num(&atom), 4);
}

#[test]
fn bond_trait_impls() {
    let bond = Bond {
        order: BondOrder::Triple,
        is_aromatic: false,
    };
    assert_eq!(HasBondOrder::bond_order(&bond), BondOrder::Triple);
    assert_eq!(SmilesBond::from(&bond).order, SmilesBondOrder::Triple);
}

#[test]
fn defaults() {
    assert_eq!(BondOrder::default(), BondOrder::Single);
    assert_eq!(SmilesBondOrder::default(), SmilesBondOrder::Single);
    let atom = Atom::default();
    assert_eq!(atom.atomic_num, 0);
    assert_eq!(atom.map_num, 0);
    assert!(!atom.no_implicit);
    assert_eq!(Mol::<Atom, Bond>::default().atom_count(), 0);
}

// --- End to end through the public surface ---

#[test]
fn parsed_molecule_round_trips_through_canonical_form() {
    let m = mol("OC(=O)c1ccccc1");
    let canon = to_canonical_smiles(&m);
    assert_eq!(to_canonical_smiles(&mol(&canon)), canon);
    assert_eq!(canonicalize_molecule("c1ccccc1C(O)=O").unwrap(), canon);
}

#[test]
fn public_validator_surface() {
    let validator = Validator::new(ValidatorConfig::default());
    assert_eq!(
        validator.validate("[C:1][O:2]>>[C:1]=[O:2]", "CO", &["C=O"], &[], false),
        Ok(())
    );
    assert_eq!(
        check_rule_syntax("C>>C"),
        Err(ValidationError::DisallowedSyntax(SyntaxIssue::NoAtomMapping))
    );
}
