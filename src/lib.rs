//! Validation of enzymatic tailoring reaction rules.
//!
//! A rule is a mapped reaction SMARTS. [`Validator::validate`] applies it
//! to a substrate and checks the predicted products against the expected
//! and forbidden products of an example. Products are compared by
//! canonical SMILES.
//!
//! The chemistry layer underneath (SMILES and SMARTS reading and writing,
//! kekulization, aromaticity, substructure search and reaction execution)
//! is usable on its own.

pub mod aromaticity;
pub mod atom;
pub mod bond;
pub mod canonical;
pub mod canonicalize;
pub mod config;
pub mod cx;
pub mod element;
pub mod enumerate;
pub mod error;
pub mod executor;
pub mod kekulize;
pub mod mol;
pub mod normalize;
pub mod reaction;
pub mod records;
pub mod rings;
pub mod smarts;
pub mod smiles;
pub mod substruct;
pub mod traits;
pub mod validator;
pub mod xref;

pub use atom::Atom;
pub use bond::{Bond, BondOrder, SmilesBond, SmilesBondOrder};
pub use canonicalize::{canonicalize_molecule, canonicalize_pattern, StructureError};
pub use config::{ConfigError, ValidatorConfig, XrefConfig};
pub use cx::CxError;
pub use element::Element;
pub use enumerate::{expand_alternatives, reaction_variants};
pub use error::{SyntaxIssue, ValidationError};
pub use kekulize::{kekulize, KekulizeError};
pub use mol::Mol;
pub use normalize::{normalize, normalize_molecule, normalize_rule, split_smiles};
pub use reaction::{from_reaction_smarts, Reaction, ReactionError, ReactionSmartsError};
pub use smarts::{from_smarts, QueryMol, SmartsError};
pub use smiles::{from_smiles, parse_smiles, to_canonical_smiles, to_smiles, SmilesError};
pub use traits::{
    HasAromaticity, HasAtomMap, HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount,
    HasIsotope,
};
pub use validator::{check_rule_syntax, Validator};

#[cfg(test)]
mod tests;
