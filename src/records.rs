//! Entry records as they appear in submission files.
//!
//! Only the fields the validator reads are typed. Everything else is kept
//! in an `extra` map so a cleaned record can be written back without
//! losing data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ValidationError;
use crate::normalize::{normalize_molecule, normalize_rule, split_smiles};
use crate::validator::Validator;

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, skip_serializing_if = "is_blank")]
    pub accession: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enzyme: Option<Enzyme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<ReactionEntry>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enzyme {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub description: Option<String>,
    #[serde(rename = "databaseIds", default)]
    pub database_ids: EnzymeDatabaseIds,
    #[serde(default)]
    pub references: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnzymeDatabaseIds {
    #[serde(default, skip_serializing_if = "is_blank")]
    pub uniprot: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub genpept: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub mibig: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactionEntry {
    #[serde(default)]
    pub tailoring: Vec<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub description: Option<String>,
    #[serde(rename = "reactionSMARTS")]
    pub reaction_smarts: String,
    #[serde(default)]
    pub reactions: Vec<ReactionExample>,
    #[serde(rename = "isIntramolecular", default)]
    pub is_intramolecular: bool,
    /// Carried as metadata; the validator applies a rule once.
    #[serde(rename = "isIterative", default)]
    pub is_iterative: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactionExample {
    pub substrate: String,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_products: Option<Vec<String>>,
    #[serde(rename = "isIntermediate", default)]
    pub is_intermediate: bool,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("example {index}: {source}")]
pub struct ExampleError {
    pub index: usize,
    #[source]
    pub source: ValidationError,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{accession}: reaction {reaction}, {source}")]
pub struct EntryError {
    pub accession: String,
    pub reaction: usize,
    #[source]
    pub source: ExampleError,
}

impl ReactionExample {
    /// Clean the substrate and products. Forbidden products written as one
    /// dot-separated string are split into separate molecules.
    pub fn clean(&mut self) {
        self.substrate = normalize_molecule(&self.substrate);
        for product in &mut self.products {
            *product = normalize_molecule(product);
        }
        if let Some(forbidden) = self.forbidden_products.take() {
            self.forbidden_products = Some(
                forbidden
                    .iter()
                    .flat_map(|p| split_smiles(&normalize_molecule(p)))
                    .collect(),
            );
        }
    }
}

impl ReactionEntry {
    pub fn clean(&mut self) {
        self.reaction_smarts = normalize_rule(&self.reaction_smarts);
        for example in &mut self.reactions {
            example.clean();
        }
    }

    /// Validate every example against this entry's rule.
    pub fn validate(&self, validator: &Validator) -> Result<(), ExampleError> {
        for (index, example) in self.reactions.iter().enumerate() {
            let expected: Vec<&str> = example.products.iter().map(String::as_str).collect();
            let forbidden: Vec<&str> = example
                .forbidden_products
                .iter()
                .flatten()
                .map(String::as_str)
                .collect();
            validator
                .validate(
                    &self.reaction_smarts,
                    &example.substrate,
                    &expected,
                    &forbidden,
                    self.is_intramolecular,
                )
                .map_err(|source| ExampleError { index, source })?;
        }
        Ok(())
    }
}

impl Entry {
    pub fn clean(&mut self) {
        for reaction in self.reactions.iter_mut().flatten() {
            reaction.clean();
        }
    }

    pub fn validate(&self, validator: &Validator) -> Result<(), EntryError> {
        for (reaction, entry) in self.reactions.iter().flatten().enumerate() {
            entry.validate(validator).map_err(|source| EntryError {
                accession: self.accession.clone().unwrap_or_default(),
                reaction,
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = r#"{
        "accession": "MITE0000001",
        "status": "active",
        "changelog": [{"version": "1.0", "date": "2024-01-01"}],
        "enzyme": {
            "name": "AlcOx",
            "description": "",
            "databaseIds": {"uniprot": "P12345", "genpept": ""},
            "references": ["doi:10.1000/xyz"]
        },
        "reactions": [{
            "tailoring": ["Oxidation"],
            "reactionSMARTS": "[#6:1]-[#8;h1:2]>>[#6:1]=[#8:2]",
            "reactions": [{
                "substrate": "CO",
                "products": ["C=O"],
                "forbidden_products": ["CC.C=C"],
                "isIntermediate": false
            }],
            "evidence": [{"evidenceCode": ["Heterologous expression"]}]
        }]
    }"#;

    fn entry() -> Entry {
        serde_json::from_str(ENTRY).unwrap()
    }

    #[test]
    fn typed_fields() {
        let e = entry();
        assert_eq!(e.accession.as_deref(), Some("MITE0000001"));
        let enzyme = e.enzyme.as_ref().unwrap();
        assert_eq!(enzyme.database_ids.uniprot.as_deref(), Some("P12345"));
        let reaction = &e.reactions.as_ref().unwrap()[0];
        assert!(!reaction.is_intramolecular);
        assert_eq!(reaction.reactions[0].products, vec!["C=O"]);
    }

    #[test]
    fn unknown_fields_survive() {
        let e = entry();
        assert!(e.extra.contains_key("changelog"));
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["changelog"][0]["version"], "1.0");
        assert_eq!(json["reactions"][0]["evidence"][0]["evidenceCode"][0], "Heterologous expression");
    }

    #[test]
    fn blank_fields_omitted() {
        let json = serde_json::to_value(entry()).unwrap();
        let enzyme = json["enzyme"].as_object().unwrap();
        assert!(!enzyme.contains_key("description"));
        assert!(!json["enzyme"]["databaseIds"].as_object().unwrap().contains_key("genpept"));
        assert!(!json.as_object().unwrap().contains_key("comment"));
    }

    #[test]
    fn clean_splits_forbidden_products() {
        let mut e = entry();
        e.clean();
        let reaction = &e.reactions.as_ref().unwrap()[0];
        assert_eq!(reaction.reaction_smarts, "[#6:1]-[#8;h1:2]>>[#6:1]=[#8:2]");
        assert_eq!(
            reaction.reactions[0].forbidden_products,
            Some(vec!["CC".to_string(), "C=C".to_string()])
        );
    }

    #[test]
    fn validate_entry() {
        let mut e = entry();
        e.clean();
        assert_eq!(e.validate(&Validator::default()), Ok(()));
    }

    #[test]
    fn failure_names_accession_and_indices() {
        let mut e = entry();
        e.reactions.as_mut().unwrap()[0].reactions[0].products = vec!["CC".into()];
        let err = e.validate(&Validator::default()).unwrap_err();
        assert_eq!(err.accession, "MITE0000001");
        assert_eq!(err.reaction, 0);
        assert_eq!(err.source.index, 0);
        assert!(err.to_string().starts_with("MITE0000001: reaction 0, example 0: "));
    }
}
