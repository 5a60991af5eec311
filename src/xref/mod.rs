//! Cross-reference checks for enzyme database identifiers.
//!
//! UniProt and GenPept accessions are resolved into each other through the
//! UniProt SPARQL endpoint; Wikidata QIDs are checked with an `ASK` query.

mod error;
mod transport;

use std::time::Duration;

use serde_json::Value;

pub use error::XrefError;
pub use transport::{HttpTransport, SparqlRequest, SparqlTransport};

use crate::config::XrefConfig;
use crate::records::EnzymeDatabaseIds;

const UNIPROT: &str = "Uniprot";
const WIKIDATA: &str = "Wikidata";

/// A matched GenPept/UniProt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIds {
    pub genpept: String,
    pub uniprot: String,
}

/// Resolves identifiers through a [`SparqlTransport`].
#[derive(Debug, Clone)]
pub struct IdResolver<T> {
    transport: T,
    config: XrefConfig,
}

impl IdResolver<HttpTransport> {
    pub fn from_config(config: &XrefConfig) -> Result<Self, XrefError> {
        let transport = HttpTransport::new(Duration::from_secs_f64(config.timeout_secs))?;
        Ok(Self::new(transport, config.clone()))
    }
}

impl<T: SparqlTransport> IdResolver<T> {
    pub fn new(transport: T, config: XrefConfig) -> Self {
        Self { transport, config }
    }

    /// UniProt accession for a GenPept (EMBL CDS) accession.
    pub fn genpept_to_uniprot(&self, genpept: &str) -> Result<String, XrefError> {
        let query = format!(
            "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\n\
             PREFIX up: <http://purl.uniprot.org/core/>\n\
             SELECT ?protein WHERE {{\n  \
             VALUES ?target {{<http://purl.uniprot.org/embl-cds/{genpept}>}}\n  \
             ?protein a up:Protein .\n  \
             ?protein rdfs:seeAlso ?target .\n}}"
        );
        self.uniprot_protein(&query)
    }

    /// GenPept accession for a UniProt accession.
    pub fn uniprot_to_genpept(&self, uniprot: &str) -> Result<String, XrefError> {
        let query = format!(
            "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\n\
             PREFIX up: <http://purl.uniprot.org/core/>\n\
             SELECT ?protein WHERE {{\n  \
             VALUES ?prefix {{<http://purl.uniprot.org/database/EMBL>}}\n  \
             <http://purl.uniprot.org/uniprot/{uniprot}> rdfs:seeAlso ?protein .\n  \
             ?protein up:database ?prefix .\n}}"
        );
        self.uniprot_protein(&query)
    }

    /// Fails with [`XrefError::UnknownQid`] when the item has no statements.
    pub fn check_wikidata_qid(&self, qid: &str) -> Result<(), XrefError> {
        let query = format!("ASK {{ wd:{qid} ?p ?o }}");
        let body = self.transport.query(&SparqlRequest {
            service: WIKIDATA,
            endpoint: &self.config.wikidata_endpoint,
            query: &query,
            format: None,
        })?;
        match body.get("boolean").and_then(Value::as_bool) {
            Some(true) => Ok(()),
            Some(false) => Err(XrefError::UnknownQid { qid: qid.to_string() }),
            None => Err(XrefError::Malformed {
                service: WIKIDATA,
                detail: "missing 'boolean' field".to_string(),
            }),
        }
    }

    /// Fill in whichever of the two accessions is missing and check that
    /// both point to the same protein when both are given. Empty strings
    /// count as absent.
    pub fn cleanup_ids(
        &self,
        genpept: Option<&str>,
        uniprot: Option<&str>,
    ) -> Result<ResolvedIds, XrefError> {
        let genpept = genpept.filter(|s| !s.is_empty());
        let uniprot = uniprot.filter(|s| !s.is_empty());

        match (genpept, uniprot) {
            (None, None) => Err(XrefError::NoIds),
            (Some(genpept), Some(uniprot)) => {
                let found = self.genpept_to_uniprot(genpept)?;
                if found != uniprot {
                    return Err(XrefError::Mismatch {
                        genpept: genpept.to_string(),
                        uniprot: uniprot.to_string(),
                    });
                }
                Ok(ResolvedIds {
                    genpept: genpept.to_string(),
                    uniprot: uniprot.to_string(),
                })
            }
            (Some(genpept), None) => Ok(ResolvedIds {
                uniprot: self.genpept_to_uniprot(genpept)?,
                genpept: genpept.to_string(),
            }),
            (None, Some(uniprot)) => Ok(ResolvedIds {
                genpept: self.uniprot_to_genpept(uniprot)?,
                uniprot: uniprot.to_string(),
            }),
        }
    }

    /// Complete the accessions of a record in place.
    ///
    /// Lookup failures are logged and leave the record unchanged; a record
    /// is never rejected because a remote service was unreachable.
    pub fn resolve_ids(&self, ids: &mut EnzymeDatabaseIds) {
        match self.cleanup_ids(ids.genpept.as_deref(), ids.uniprot.as_deref()) {
            Ok(resolved) => {
                ids.genpept = Some(resolved.genpept);
                ids.uniprot = Some(resolved.uniprot);
            }
            Err(e) => tracing::warn!(error = %e, "error during enzyme ID validation"),
        }
    }

    fn uniprot_protein(&self, query: &str) -> Result<String, XrefError> {
        let body = self.transport.query(&SparqlRequest {
            service: UNIPROT,
            endpoint: &self.config.uniprot_endpoint,
            query,
            format: Some("srj"),
        })?;
        let first = body
            .pointer("/results/bindings")
            .and_then(Value::as_array)
            .and_then(|bindings| bindings.first())
            .ok_or(XrefError::NoResults)?;
        let uri = first
            .pointer("/protein/value")
            .and_then(Value::as_str)
            .ok_or(XrefError::MissingProtein)?;
        Ok(uri.rsplit('/').next().unwrap_or(uri).to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;

    /// Answers with canned documents and records every query.
    struct Canned {
        answer: Box<dyn Fn(&SparqlRequest<'_>) -> Result<Value, XrefError>>,
        seen: RefCell<Vec<String>>,
    }

    impl SparqlTransport for Canned {
        fn query(&self, request: &SparqlRequest<'_>) -> Result<Value, XrefError> {
            self.seen.borrow_mut().push(request.query.to_string());
            (self.answer)(request)
        }
    }

    fn resolver(
        answer: impl Fn(&SparqlRequest<'_>) -> Result<Value, XrefError> + 'static,
    ) -> IdResolver<Canned> {
        let transport = Canned { answer: Box::new(answer), seen: RefCell::new(Vec::new()) };
        IdResolver::new(transport, XrefConfig::default())
    }

    fn protein(uri: &str) -> Value {
        json!({"results": {"bindings": [{"protein": {"type": "uri", "value": uri}}]}})
    }

    // --- UniProt lookups ---

    #[test]
    fn genpept_to_uniprot_takes_last_segment() {
        let r = resolver(|req| {
            assert_eq!(req.service, UNIPROT);
            assert_eq!(req.format, Some("srj"));
            Ok(protein("http://purl.uniprot.org/uniprot/Q9X2V6"))
        });
        assert_eq!(r.genpept_to_uniprot("AAD28494.1").unwrap(), "Q9X2V6");
        let seen = r.transport.seen.borrow();
        assert!(seen[0].contains("<http://purl.uniprot.org/embl-cds/AAD28494.1>"));
    }

    #[test]
    fn uniprot_to_genpept_query() {
        let r = resolver(|_| Ok(protein("http://purl.uniprot.org/embl-cds/AAD28494.1")));
        assert_eq!(r.uniprot_to_genpept("Q9X2V6").unwrap(), "AAD28494.1");
        let seen = r.transport.seen.borrow();
        assert!(seen[0].contains("<http://purl.uniprot.org/uniprot/Q9X2V6> rdfs:seeAlso ?protein"));
        assert!(seen[0].contains("<http://purl.uniprot.org/database/EMBL>"));
    }

    #[test]
    fn empty_bindings() {
        let r = resolver(|_| Ok(json!({"results": {"bindings": []}})));
        assert!(matches!(r.genpept_to_uniprot("X"), Err(XrefError::NoResults)));
    }

    #[test]
    fn missing_protein() {
        let r = resolver(|_| Ok(json!({"results": {"bindings": [{"other": {}}]}})));
        assert!(matches!(r.uniprot_to_genpept("X"), Err(XrefError::MissingProtein)));
    }

    #[test]
    fn http_status_message() {
        let r = resolver(|req| Err(XrefError::Status { service: req.service, status: 503 }));
        let err = r.genpept_to_uniprot("X").unwrap_err();
        assert_eq!(err.to_string(), "HTTP Error while querying Uniprot: 503");
    }

    // --- Wikidata ---

    #[test]
    fn wikidata_ask() {
        let r = resolver(|req| {
            assert_eq!(req.service, WIKIDATA);
            assert_eq!(req.query, "ASK { wd:Q42 ?p ?o }");
            Ok(json!({"head": {}, "boolean": true}))
        });
        assert!(r.check_wikidata_qid("Q42").is_ok());

        let r = resolver(|_| Ok(json!({"boolean": false})));
        assert!(matches!(
            r.check_wikidata_qid("Q0"),
            Err(XrefError::UnknownQid { ref qid }) if qid == "Q0"
        ));

        let r = resolver(|_| Ok(json!({})));
        assert!(matches!(r.check_wikidata_qid("Q1"), Err(XrefError::Malformed { .. })));
    }

    // --- ID cleanup ---

    #[test]
    fn cleanup_requires_an_id() {
        let r = resolver(|_| panic!("no query expected"));
        assert!(matches!(r.cleanup_ids(None, None), Err(XrefError::NoIds)));
        assert!(matches!(r.cleanup_ids(Some(""), Some("")), Err(XrefError::NoIds)));
    }

    #[test]
    fn cleanup_fills_missing_side() {
        let r = resolver(|_| Ok(protein("http://purl.uniprot.org/uniprot/P1")));
        assert_eq!(
            r.cleanup_ids(Some("G1"), None).unwrap(),
            ResolvedIds { genpept: "G1".into(), uniprot: "P1".into() }
        );

        let r = resolver(|_| Ok(protein("http://purl.uniprot.org/embl-cds/G1")));
        assert_eq!(
            r.cleanup_ids(Some(""), Some("P1")).unwrap(),
            ResolvedIds { genpept: "G1".into(), uniprot: "P1".into() }
        );
    }

    #[test]
    fn cleanup_detects_mismatch() {
        let r = resolver(|_| Ok(protein("http://purl.uniprot.org/uniprot/P2")));
        assert!(matches!(
            r.cleanup_ids(Some("G1"), Some("P1")),
            Err(XrefError::Mismatch { .. })
        ));
        let r = resolver(|_| Ok(protein("http://purl.uniprot.org/uniprot/P1")));
        assert!(r.cleanup_ids(Some("G1"), Some("P1")).is_ok());
    }

    #[test]
    fn resolve_ids_is_lenient() {
        let r = resolver(|_| Ok(json!({"results": {"bindings": []}})));
        let mut ids = EnzymeDatabaseIds { uniprot: Some("P1".into()), ..Default::default() };
        r.resolve_ids(&mut ids);
        assert_eq!(ids.uniprot.as_deref(), Some("P1"));
        assert_eq!(ids.genpept, None);

        let r = resolver(|_| Ok(protein("http://purl.uniprot.org/embl-cds/G1")));
        r.resolve_ids(&mut ids);
        assert_eq!(ids.genpept.as_deref(), Some("G1"));
    }
}
