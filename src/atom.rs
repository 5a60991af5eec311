use crate::traits::{
    HasAromaticity, HasAtomMap, HasAtomicNum, HasFormalCharge, HasHydrogenCount, HasIsotope,
};

/// Default atom type for a molecular graph node.
///
/// `Atom` stores the constitution-level properties needed to compare
/// substrates and products: element, charge, isotope, hydrogen count,
/// aromaticity and the atom-map label. Stereochemistry is not represented.
///
/// # Examples
///
/// ```
/// use tailorcheck::Atom;
///
/// let carbon = Atom {
///     atomic_num: 6,
///     hydrogen_count: 3,
///     ..Atom::default()
/// };
/// assert_eq!(carbon.atomic_num, 6);
/// assert_eq!(carbon.map_num, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atom {
    /// Atomic number (1 = H, 6 = C, 7 = N, …). `0` is the `*` dummy atom.
    pub atomic_num: u8,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Mass number. `0` means natural isotopic abundance.
    pub isotope: u16,
    /// Number of suppressed hydrogens on this atom.
    ///
    /// Hydrogens are never graph nodes. After [`finalize`](crate::smiles::finalize)
    /// this count is the single source of truth for how many Hs the atom carries.
    pub hydrogen_count: u8,
    /// Whether this atom is in an aromatic ring.
    ///
    /// Set by the SMILES reader for lowercase atoms, then recomputed by
    /// aromaticity perception on the Kekulé form.
    pub is_aromatic: bool,
    /// Atom-map number from a `[C:n]` label, `0` when unmapped.
    pub map_num: u16,
    /// `true` when `hydrogen_count` was given explicitly (bracket atoms,
    /// reaction products) and must not be recomputed from default valences.
    pub no_implicit: bool,
}

impl HasAtomicNum for Atom {
    fn atomic_num(&self) -> u8 {
        self.atomic_num
    }
}

impl HasFormalCharge for Atom {
    fn formal_charge(&self) -> i8 {
        self.formal_charge
    }
}

impl HasIsotope for Atom {
    fn isotope(&self) -> u16 {
        self.isotope
    }
}

impl HasHydrogenCount for Atom {
    fn hydrogen_count(&self) -> u8 {
        self.hydrogen_count
    }
}

impl HasAromaticity for Atom {
    fn is_aromatic(&self) -> bool {
        self.is_aromatic
    }
}

impl HasAtomMap for Atom {
    fn map_num(&self) -> u16 {
        self.map_num
    }

    fn set_map_num(&mut self, map_num: u16) {
        self.map_num = map_num;
    }
}
