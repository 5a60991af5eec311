use thiserror::Error;

#[derive(Debug, Error)]
pub enum XrefError {
    #[error("Please provide one of NCBI Genpept or Uniprot IDs.")]
    NoIds,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP Error while querying {service}: {status}")]
    Status { service: &'static str, status: u16 },

    #[error("No results found in Uniprot response")]
    NoResults,

    #[error("'protein' key or its 'value' is missing in the Uniprot response")]
    MissingProtein,

    #[error("malformed {service} response: {detail}")]
    Malformed {
        service: &'static str,
        detail: String,
    },

    #[error("The provided Genpept ID '{genpept}' and Uniprot ID '{uniprot}' do not correspond to each other!")]
    Mismatch { genpept: String, uniprot: String },

    #[error("Wikidata QID '{qid}' does not exist or has no statements.")]
    UnknownQid { qid: String },
}
