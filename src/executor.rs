//! Application of rule variants to a substrate.
//!
//! The right reactant order and the right rule variant are not known in
//! advance, so every variant is tried against every ordering of the
//! substrate's fragments. Failed applications are skipped.

use std::collections::BTreeSet;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::canonicalize::{canonical_smiles, molecule_variants};
use crate::config::ValidatorConfig;
use crate::error::ValidationError;
use crate::mol::{fragments, Mol};
use crate::reaction::Reaction;

/// Canonical SMILES of every product reachable from `substrate`.
///
/// The substrate's CX layer is expanded first. For an intramolecular rule
/// only single-fragment substrate variants are used, as one reactant;
/// otherwise every permutation of the fragments is tried.
pub fn run(
    variants: &[Reaction],
    substrate: &str,
    intramolecular: bool,
    config: &ValidatorConfig,
) -> Result<BTreeSet<String>, ValidationError> {
    let substrate_variants =
        molecule_variants(substrate).map_err(|e| ValidationError::invalid_structure(substrate, e))?;

    let mut products = BTreeSet::new();
    for (vi, mol) in substrate_variants.iter().enumerate() {
        let frags = fragments(mol);
        if intramolecular && frags.len() > 1 {
            tracing::debug!(
                variant = vi,
                fragments = frags.len(),
                "skipping multi-fragment substrate for intramolecular rule"
            );
            continue;
        }
        if frags.len() > config.max_permutation_fragments {
            tracing::warn!(
                variant = vi,
                fragments = frags.len(),
                limit = config.max_permutation_fragments,
                "too many substrate fragments to permute; skipping"
            );
            continue;
        }

        let orders = if intramolecular {
            vec![(0..frags.len()).collect()]
        } else {
            permutations(frags.len())
        };

        for reaction in variants {
            for order in &orders {
                let reactants: Vec<&Mol<Atom, Bond>> = order.iter().map(|&i| &frags[i]).collect();
                match reaction.run_with_limit(&reactants, config.max_match_combinations) {
                    Ok(sets) => {
                        for product in sets.iter().flatten() {
                            products.insert(canonical_smiles(product));
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "error during running of reaction"),
                }
            }
        }
    }
    Ok(products)
}

/// All orderings of `0..n` in lexicographic order.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    let mut current: Vec<usize> = (0..n).collect();
    let mut out = vec![current.clone()];
    // Narayana's next-permutation step until the sequence is descending.
    loop {
        let Some(i) = (1..n).rev().find(|&i| current[i - 1] < current[i]) else {
            return out;
        };
        let pivot = i - 1;
        let Some(j) = (i..n).rev().find(|&j| current[j] > current[pivot]) else {
            return out;
        };
        current.swap(pivot, j);
        current[i..].reverse();
        out.push(current.clone());
    }
}
