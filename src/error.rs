use thiserror::Error;

use crate::canonicalize::StructureError;

/// Rule syntax the validator refuses to work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxIssue {
    #[error(
        "No atom mapping in reaction SMARTS detected (e.g. '[#6:1]>>[#6:1]-[#8]').\n \
         Please add it and try again.\n"
    )]
    NoAtomMapping,
    #[error(
        "Explicit hydrogen atoms detected in reaction SMARTS (e.g. '[H]'), which is not allowed.\n \
         Depicting chirality? Please specify the stereochemistry using one of the heavy \
         (non-hydrogen) atoms connected to the stereocenter.\n"
    )]
    ExplicitHydrogen,
    #[error(
        "Reaction SMARTS with CXSMARTS (Chemaxon SMARTS) elements detected, which are not \
         supported.\nCXSMARTS (aka 'Extended SMARTS') can be recognized with a suffix starting \
         with a pipe character ('|').\n Please export as a Daylight SMARTS or remove the \
         CXSMARTS suffix manually and try again.\n"
    )]
    CxExtension,
}

/// Why a reaction example failed validation.
///
/// Semantic failures carry the canonical product sets involved so the
/// message alone is enough to see which rule or example is wrong.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("At least one product must be specified")]
    EmptyExpectedProducts,

    #[error("{0}")]
    DisallowedSyntax(SyntaxIssue),

    #[error("rejected structure string - is it valid?\n{input}\n{source}")]
    InvalidStructure {
        input: String,
        #[source]
        source: StructureError,
    },

    #[error("Overlap between expected and forbidden products:\n{}\n", .overlap.join("\n"))]
    Overlap { overlap: Vec<String> },

    #[error(
        "Reaction did not lead to all expected products.\nExpected products:\n{}\nGenerated products:\n{}\n",
        .expected.join("\n"),
        .predicted.join("\n")
    )]
    MissingExpectedProducts {
        expected: Vec<String>,
        predicted: Vec<String>,
    },

    #[error(
        "Reaction product(s) belong(s) to the specified forbidden product(s):\n{}\nGenerated products:\n{}\n",
        .produced.join("\n"),
        .predicted.join("\n")
    )]
    ForbiddenProductProduced {
        produced: Vec<String>,
        predicted: Vec<String>,
    },
}

impl ValidationError {
    pub(crate) fn invalid_structure(input: &str, source: impl Into<StructureError>) -> Self {
        Self::InvalidStructure {
            input: input.to_string(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::SmilesError;

    #[test]
    fn empty_expected_message() {
        assert_eq!(
            ValidationError::EmptyExpectedProducts.to_string(),
            "At least one product must be specified"
        );
    }

    #[test]
    fn invalid_structure_names_the_input() {
        let err = ValidationError::invalid_structure("C1CC", SmilesError::UnclosedRing { digit: 1 });
        let msg = err.to_string();
        assert!(msg.contains("C1CC"), "{msg}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn missing_products_lists_both_sets() {
        let err = ValidationError::MissingExpectedProducts {
            expected: vec!["C=C".into()],
            predicted: vec!["O=CO".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Expected products:\nC=C"), "{msg}");
        assert!(msg.contains("Generated products:\nO=CO"), "{msg}");
    }

    #[test]
    fn syntax_issue_is_transparent() {
        let err = ValidationError::DisallowedSyntax(SyntaxIssue::ExplicitHydrogen);
        assert!(err.to_string().starts_with("Explicit hydrogen atoms detected"));
    }
}
