pub mod error;
mod parser;
mod runner;
mod writer;

pub use error::{ReactionError, ReactionSmartsError};
pub use parser::parse_reaction_smarts;
pub use runner::DEFAULT_MAX_COMBINATIONS;
pub use writer::to_reaction_smarts;

use crate::smarts::QueryMol;

/// A parsed reaction SMARTS: reactant and product templates whose atoms
/// are linked by shared map numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub(crate) reactant_templates: Vec<QueryMol>,
    pub(crate) product_templates: Vec<QueryMol>,
}

impl Reaction {
    pub fn reactant_templates(&self) -> &[QueryMol] {
        &self.reactant_templates
    }

    pub fn product_templates(&self) -> &[QueryMol] {
        &self.product_templates
    }
}

pub fn from_reaction_smarts(s: &str) -> Result<Reaction, ReactionSmartsError> {
    parse_reaction_smarts(s)
}
