//! The reaction validation entry point.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::canonicalize::canonicalize_molecule;
use crate::config::ValidatorConfig;
use crate::enumerate::reaction_variants;
use crate::error::{SyntaxIssue, ValidationError};
use crate::executor;
use crate::normalize::{normalize_molecule, normalize_rule};

static MAPPED_ATOM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.+:\d+\]").expect("valid regex"));

/// Checks that a reaction rule turns a substrate into the declared
/// products.
///
/// A `Validator` holds only its configuration; one instance can be shared
/// by any number of callers.
///
/// # Examples
///
/// ```
/// use tailorcheck::{ValidationError, Validator};
///
/// let validator = Validator::default();
/// validator
///     .validate("[C:1][O:2]>>[C:1]=[O:2]", "CO", &["C=O"], &[], false)
///     .unwrap();
///
/// let err = validator
///     .validate("[C:1][O:2]>>[C:1]=[O:2]", "CO", &["C=O"], &["C=O"], false)
///     .unwrap_err();
/// assert!(matches!(err, ValidationError::Overlap { .. }));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate one example of a rule.
    ///
    /// Every expected product must be among the predicted products and no
    /// forbidden product may be. Products are compared by canonical SMILES.
    /// Checks run in a fixed order and the first failure is returned.
    pub fn validate(
        &self,
        rule: &str,
        substrate: &str,
        expected: &[&str],
        forbidden: &[&str],
        intramolecular: bool,
    ) -> Result<(), ValidationError> {
        if expected.is_empty() {
            return Err(ValidationError::EmptyExpectedProducts);
        }
        check_rule_syntax(rule)?;

        let _span = tracing::debug_span!("validate", rule, substrate).entered();

        let rule = normalize_rule(rule);
        let substrate = normalize_molecule(substrate);

        let expected = canonical_set(expected)?;
        let forbidden = canonical_set(forbidden)?;

        let overlap: Vec<String> = expected.intersection(&forbidden).cloned().collect();
        if !overlap.is_empty() {
            return Err(ValidationError::Overlap { overlap });
        }

        let variants = reaction_variants(&rule)?;
        tracing::debug!(variants = variants.len(), "built rule variants");

        let predicted = executor::run(&variants, &substrate, intramolecular, &self.config)?;
        tracing::debug!(products = predicted.len(), "ran rule variants");

        if !expected.is_subset(&predicted) {
            return Err(ValidationError::MissingExpectedProducts {
                expected: expected.into_iter().collect(),
                predicted: predicted.into_iter().collect(),
            });
        }

        let produced: Vec<String> = forbidden.intersection(&predicted).cloned().collect();
        if !produced.is_empty() {
            return Err(ValidationError::ForbiddenProductProduced {
                produced,
                predicted: predicted.into_iter().collect(),
            });
        }

        tracing::debug!("successfully validated reaction SMARTS");
        Ok(())
    }
}

/// Reject rule syntax the pipeline does not support: rules without atom
/// maps, explicit `[H]` atoms and CX suffixes.
pub fn check_rule_syntax(rule: &str) -> Result<(), ValidationError> {
    if !MAPPED_ATOM.is_match(rule) {
        return Err(ValidationError::DisallowedSyntax(SyntaxIssue::NoAtomMapping));
    }
    if rule.contains("[H]") {
        return Err(ValidationError::DisallowedSyntax(SyntaxIssue::ExplicitHydrogen));
    }
    if rule.contains('|') {
        return Err(ValidationError::DisallowedSyntax(SyntaxIssue::CxExtension));
    }
    Ok(())
}

fn canonical_set(smiles: &[&str]) -> Result<BTreeSet<String>, ValidationError> {
    smiles
        .iter()
        .map(|s| canonicalize_molecule(s).map_err(|e| ValidationError::invalid_structure(s, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OXIDATION: &str = "[C:1][O:2]>>[C:1]=[O:2]";

    fn validate(
        rule: &str,
        substrate: &str,
        expected: &[&str],
        forbidden: &[&str],
    ) -> Result<(), ValidationError> {
        Validator::default().validate(rule, substrate, expected, forbidden, false)
    }

    // --- Ordering of checks ---

    #[test]
    fn empty_expected_checked_first() {
        assert_eq!(
            validate("not a rule", "not a molecule", &[], &[]),
            Err(ValidationError::EmptyExpectedProducts)
        );
    }

    #[test]
    fn syntax_checked_before_parsing() {
        assert_eq!(
            validate("CO>>C=O", "C1CC", &["C=O"], &[]),
            Err(ValidationError::DisallowedSyntax(SyntaxIssue::NoAtomMapping))
        );
    }

    #[test]
    fn explicit_hydrogen_rejected() {
        assert_eq!(
            check_rule_syntax("[C:1][H]>>[C:1]O"),
            Err(ValidationError::DisallowedSyntax(SyntaxIssue::ExplicitHydrogen))
        );
    }

    #[test]
    fn cx_rule_rejected() {
        assert_eq!(
            check_rule_syntax("[C:1]O>>[C:1]=O |$;;$|"),
            Err(ValidationError::DisallowedSyntax(SyntaxIssue::CxExtension))
        );
    }

    #[test]
    fn invalid_expected_product() {
        let err = validate(OXIDATION, "CO", &["C1=O"], &[]).unwrap_err();
        match err {
            ValidationError::InvalidStructure { input, .. } => assert_eq!(input, "C1=O"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overvalent_forbidden_product() {
        let err = validate(OXIDATION, "CO", &["C=O"], &["CO(C)(C)C"]).unwrap_err();
        match err {
            ValidationError::InvalidStructure { input, .. } => assert_eq!(input, "CO(C)(C)C"),
            other => panic!("unexpected {other:?}"),
        }
    }

    // --- Outcomes ---

    #[test]
    fn success() {
        assert_eq!(validate(OXIDATION, "CO", &["C=O"], &[]), Ok(()));
    }

    #[test]
    fn overlap() {
        assert_eq!(
            validate(OXIDATION, "CO", &["C=O"], &["O=C"]),
            Err(ValidationError::Overlap {
                overlap: vec![canonicalize_molecule("C=O").unwrap()]
            })
        );
    }

    #[test]
    fn missing_expected() {
        let err = validate(OXIDATION, "OCO", &["C=C"], &[]).unwrap_err();
        match err {
            ValidationError::MissingExpectedProducts { predicted, .. } => {
                assert_eq!(predicted, vec![canonicalize_molecule("O=CO").unwrap()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn forbidden_produced() {
        let err = validate(
            "[C:1][OH:2]>>[C:1]=[O:2]",
            "OCCO",
            &["O=CCO"],
            &["O=CC=O"],
        );
        // one oxidation per match, so the dialdehyde is never produced
        assert_eq!(err, Ok(()));

        let err = validate("[c:1]>>[c:1][Cl,Br:2]", "c1ccccc1", &["Clc1ccccc1"], &["Brc1ccccc1"])
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ForbiddenProductProduced { ref produced, .. } if produced.len() == 1
        ));
    }

    #[test]
    fn rule_cleanup_applied() {
        // bare halogen in the rule is bracketed before parsing
        assert_eq!(
            validate("[c:1]-Cl>>[c:1]-[OH]", "Clc1ccccc1", &["Oc1ccccc1"], &[]),
            Ok(())
        );
    }
}
