//! Canonical string forms for molecules and patterns.
//!
//! Canonical SMILES is the only notion of molecular identity used by the
//! validator: two structures are the same molecule exactly when their
//! canonical strings are equal.

use petgraph::graph::{EdgeIndex, NodeIndex};
use thiserror::Error;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::canonical::{canonical_ranks, fnv_hash};
use crate::cx::{check_references, enumerate_structural_variants, parse_cx, CxError, CxExtensions};
use crate::mol::Mol;
use crate::normalize::normalize_molecule;
use crate::reaction::ReactionSmartsError;
use crate::smarts::{atom_expr_text, bond_expr_text, bracket_atom, from_smarts, BondExpr, QueryMol};
use crate::smiles::{finalize, parse_smiles, split_cx, to_canonical_smiles, write_components};
use crate::smiles::SmilesError;
use crate::smarts::SmartsError;
use crate::traits::HasAtomMap;

/// Why a structure string could not be read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructureError {
    #[error("invalid SMILES: {0}")]
    Smiles(#[from] SmilesError),
    #[error("invalid SMARTS: {0}")]
    Smarts(#[from] SmartsError),
    #[error("invalid extension layer: {0}")]
    Cx(#[from] CxError),
    #[error("invalid reaction SMARTS: {0}")]
    Reaction(#[from] ReactionSmartsError),
}

/// Canonical SMILES of a molecule string, with atom maps cleared.
///
/// The string is cleaned with [`normalize_molecule`] first. A CX suffix
/// must be well formed and refer to atoms of the molecule, but does not
/// take part in the canonical form.
pub fn canonicalize_molecule(s: &str) -> Result<String, StructureError> {
    let cleaned = normalize_molecule(s);
    let raw = parse_smiles(&cleaned)?;
    if let (_, Some(cx)) = split_cx(&cleaned) {
        check_references(&raw, &parse_cx(cx)?)?;
    }
    Ok(canonical_smiles(&finalize(raw)?))
}

/// Canonical SMILES of a perceived molecule, ignoring atom maps.
pub fn canonical_smiles(mol: &Mol<Atom, Bond>) -> String {
    if mol.atoms().all(|idx| mol.atom(idx).map_num == 0) {
        return to_canonical_smiles(mol);
    }
    let unmapped = mol.map_atoms(|_, atom| {
        let mut atom = atom.clone();
        atom.set_map_num(0);
        atom
    });
    to_canonical_smiles(&unmapped)
}

/// Canonical SMARTS of a pattern string.
///
/// Atoms are ranked from their expressions alone and every atom is
/// written with its rank as the map number, so the maps are always
/// `0..n` in canonical order whatever maps the input carried.
pub fn canonicalize_pattern(s: &str) -> Result<String, StructureError> {
    let query = from_smarts(&normalize_molecule(s))?;
    Ok(canonical_smarts(&query))
}

pub fn canonical_smarts(query: &QueryMol) -> String {
    let ranks = canonical_ranks(
        query,
        |node| fnv_hash(&atom_expr_text(&query.atom(node).expr)),
        |edge| fnv_hash(&bond_expr_text(query.bond(edge))),
    );
    let atom_text = |node: NodeIndex| {
        bracket_atom(&query.atom(node).expr, Some(ranks[node.index()] as u16))
    };
    let bond_text = |edge: EdgeIndex| match query.bond(edge) {
        BondExpr::SingleOrAromatic => String::new(),
        other => bond_expr_text(other),
    };
    let mut parts = write_components(query, &ranks, &atom_text, &bond_text);
    parts.sort();
    parts.join(".")
}

/// Parse a SMILES string and expand its CX variation fields into
/// perceived molecules. Without a CX layer the result has one entry.
pub fn molecule_variants(s: &str) -> Result<Vec<Mol<Atom, Bond>>, StructureError> {
    let raw = parse_smiles(s)?;
    let ext = match split_cx(s) {
        (_, Some(cx)) => parse_cx(cx)?,
        (_, None) => CxExtensions::default(),
    };
    enumerate_structural_variants(&raw, &ext)?
        .into_iter()
        .map(|variant| finalize(variant).map_err(StructureError::from))
        .collect()
}
