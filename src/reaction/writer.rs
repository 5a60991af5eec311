use crate::mol::component_labels;
use crate::smarts::{to_smarts, QueryMol};

use super::Reaction;

pub fn to_reaction_smarts(rxn: &Reaction) -> String {
    format!(
        "{}>>{}",
        write_side(&rxn.reactant_templates),
        write_side(&rxn.product_templates)
    )
}

/// Templates joined with `.`; a template with several parts is written as
/// a `(...)` group so it reads back as one template.
pub(crate) fn write_side(templates: &[QueryMol]) -> String {
    templates
        .iter()
        .map(|tmpl| {
            let text = to_smarts(tmpl);
            if component_labels(tmpl).1 > 1 {
                format!("({text})")
            } else {
                text
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
