//! SPARQL validation gate
//!
//! Decides whether a model-supplied SPARQL query is safe and well-formed
//! to execute against the read-only knowledge-graph endpoint. Two
//! independent checks:
//!
//! 1. Policy: the upper-cased query must not contain any of the SPARQL
//!    mutation/admin keywords as a substring. This is deliberately a
//!    naive textual match, independent of the parser: a keyword inside a
//!    string literal or comment still rejects. Known over-approximation.
//! 2. Syntax: the query must parse under the SPARQL 1.1 grammar. The
//!    parser's message is embedded in the failure so the model can
//!    self-correct without a wasted network round trip.
//!
//! The query endpoint predeclares the well-known Wikidata prefixes, so
//! the syntax check parses against the same prelude; a bare
//! `SELECT ?x WHERE { ?x wdt:P31 wd:Q5 }` is valid here just as it is
//! against the live service.

use thiserror::Error;

/// SPARQL mutation/admin vocabulary. Any of these appearing anywhere in
/// the query text fails the policy check.
const BLOCKED_KEYWORDS: &[&str] = &["DELETE", "INSERT", "DROP", "CREATE", "CLEAR", "LOAD"];

/// Prefixes the query service predeclares. Prepended for the syntax
/// check only; never sent anywhere.
const PREFIX_PRELUDE: &str = "\
PREFIX wd: <http://www.wikidata.org/entity/>
PREFIX wdt: <http://www.wikidata.org/prop/direct/>
PREFIX wikibase: <http://wikiba.se/ontology#>
PREFIX p: <http://www.wikidata.org/prop/>
PREFIX ps: <http://www.wikidata.org/prop/statement/>
PREFIX pq: <http://www.wikidata.org/prop/qualifier/>
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
PREFIX schema: <http://schema.org/>
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
PREFIX bd: <http://www.bigdata.com/rdf#>
";

/// Why a query was rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The query contains a write/administrative keyword
    #[error("Query rejected: contains forbidden keyword '{0}' (the endpoint is read-only)")]
    ForbiddenKeyword(String),

    /// The query does not parse under the SPARQL grammar
    #[error("Query has invalid SPARQL syntax: {0}")]
    Syntax(String),
}

/// Validates SPARQL query strings before they reach the network.
///
/// # Example
///
/// ```
/// use atlas_engine::validator::SparqlValidator;
///
/// let validator = SparqlValidator::new();
/// assert!(validator
///     .validate("SELECT ?x WHERE { ?x wdt:P31 wd:Q5 }")
///     .is_ok());
/// assert!(validator
///     .validate("DELETE WHERE { ?x ?y ?z }")
///     .is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SparqlValidator;

impl SparqlValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a query string. `Ok(())` means safe to execute.
    ///
    /// The policy scan runs first: a mutation keyword must be named as
    /// the reason even when the query also fails to parse. Both checks
    /// are side-effect free.
    pub fn validate(&self, query: &str) -> Result<(), ValidationError> {
        if let Some(keyword) = Self::scan_keywords(query) {
            tracing::warn!("Rejected query containing '{}'", keyword);
            return Err(ValidationError::ForbiddenKeyword(keyword));
        }

        let prefixed = format!("{}{}", PREFIX_PRELUDE, query);
        spargebra::Query::parse(&prefixed, None)
            .map_err(|e| ValidationError::Syntax(e.to_string()))?;

        Ok(())
    }

    /// Case-insensitive substring scan over the blocklist.
    fn scan_keywords(query: &str) -> Option<String> {
        let upper = query.to_uppercase();
        BLOCKED_KEYWORDS
            .iter()
            .find(|kw| upper.contains(**kw))
            .map(|kw| (*kw).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select_passes() {
        let validator = SparqlValidator::new();
        assert!(validator
            .validate("SELECT ?x WHERE { ?x wdt:P31 wd:Q5 }")
            .is_ok());
    }

    #[test]
    fn test_select_with_limit_and_label_service_passes() {
        let validator = SparqlValidator::new();
        let query = r#"SELECT ?city ?cityLabel ?population WHERE {
            ?city wdt:P31 wd:Q515 ; wdt:P1082 ?population .
            SERVICE wikibase:label { bd:serviceParam wikibase:language "en" . }
        } ORDER BY DESC(?population) LIMIT 5"#;
        assert!(validator.validate(query).is_ok());
    }

    #[test]
    fn test_delete_rejected_naming_keyword() {
        let validator = SparqlValidator::new();
        let err = validator
            .validate("DELETE WHERE { ?x ?y ?z }")
            .unwrap_err();
        assert_eq!(err, ValidationError::ForbiddenKeyword("DELETE".to_string()));
        assert!(err.to_string().contains("DELETE"));
    }

    #[test]
    fn test_keyword_scan_is_case_insensitive() {
        let validator = SparqlValidator::new();
        let err = validator
            .validate("insert data { <a> <b> <c> }")
            .unwrap_err();
        assert_eq!(err, ValidationError::ForbiddenKeyword("INSERT".to_string()));
    }

    #[test]
    fn test_keyword_inside_literal_still_rejected() {
        // Documented over-approximation of the substring scan
        let validator = SparqlValidator::new();
        let query = r#"SELECT ?x WHERE { ?x rdfs:label "How to delete a file" }"#;
        assert_eq!(
            validator.validate(query).unwrap_err(),
            ValidationError::ForbiddenKeyword("DELETE".to_string())
        );
    }

    #[test]
    fn test_keyword_wins_over_syntax_failure() {
        // Both checks would fail; the keyword is reported
        let validator = SparqlValidator::new();
        let err = validator.validate("DROP GRAPH <g").unwrap_err();
        assert_eq!(err, ValidationError::ForbiddenKeyword("DROP".to_string()));
    }

    #[test]
    fn test_unbalanced_braces_fail_syntax() {
        let validator = SparqlValidator::new();
        match validator.validate("SELECT ?x WHERE {").unwrap_err() {
            ValidationError::Syntax(reason) => assert!(!reason.is_empty()),
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_query_fails_syntax() {
        let validator = SparqlValidator::new();
        assert!(matches!(
            validator.validate("").unwrap_err(),
            ValidationError::Syntax(_)
        ));
    }

    #[test]
    fn test_ask_and_describe_pass() {
        let validator = SparqlValidator::new();
        assert!(validator.validate("ASK { wd:Q42 wdt:P31 wd:Q5 }").is_ok());
        assert!(validator.validate("DESCRIBE wd:Q42").is_ok());
    }

    #[test]
    fn test_own_prefix_declarations_still_parse() {
        let validator = SparqlValidator::new();
        let query = "PREFIX ex: <http://example.org/> SELECT ?x WHERE { ?x ex:knows ?y }";
        assert!(validator.validate(query).is_ok());
    }
}
