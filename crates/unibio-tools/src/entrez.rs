//! NCBI Entrez E-utilities client
//!
//! Uses the JSON flavour of `esearch`/`esummary` and the plain-text FASTA and
//! MEDLINE formats of `efetch`. Record shaping for the model happens in the
//! builtin tools; this module only talks to NCBI and parses what comes back.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use unibio_core::AppConfig;

pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Identifies this client to NCBI alongside the contact email
const TOOL_NAME: &str = "unibio";

/// One nucleotide search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NucleotideSummary {
    pub accession: String,
    pub title: String,
    pub id: String,
    pub length: u64,
}

/// A single FASTA record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastaRecord {
    /// First whitespace-delimited token of the header
    pub id: String,
    /// Full header line without the leading `>`
    pub description: String,
    pub sequence: String,
}

/// A MEDLINE record: every tag maps to the values it carried, in order.
/// Continuation lines are folded into the preceding value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedlineRecord {
    fields: BTreeMap<String, Vec<String>>,
}

impl MedlineRecord {
    /// First value of a tag
    pub fn first(&self, tag: &str) -> Option<&str> {
        self.fields
            .get(tag)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of a tag (empty when absent)
    pub fn all(&self, tag: &str) -> &[String] {
        self.fields.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, tag: &str, value: &str) {
        self.fields
            .entry(tag.to_string())
            .or_default()
            .push(value.to_string());
    }

    fn extend_last(&mut self, tag: &str, continuation: &str) {
        if let Some(last) = self.fields.get_mut(tag).and_then(|v| v.last_mut()) {
            last.push(' ');
            last.push_str(continuation);
        }
    }
}

#[derive(Debug, Deserialize)]
struct ESearchEnvelope {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// Thin async client over the E-utilities endpoints
#[derive(Clone)]
pub struct EntrezClient {
    client: Client,
    base_url: String,
    email: Option<String>,
    api_key: Option<String>,
}

impl EntrezClient {
    pub fn new(email: Option<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building Entrez HTTP client")?;
        Ok(Self {
            client,
            base_url: EUTILS_BASE_URL.to_string(),
            email,
            api_key,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.ncbi_email.clone(),
            config.ncbi_api_key.clone(),
            config.slow_tool_timeout,
        )
    }

    /// Point the client at another E-utilities host (mirrors, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("tool", TOOL_NAME.to_string()));
        if let Some(email) = &self.email {
            query.push(("email", email.clone()));
        }
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }

        debug!(endpoint = %endpoint, "Entrez request");
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("NCBI {} request failed", endpoint))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("reading NCBI {} response", endpoint))?;
        if !status.is_success() {
            return Err(anyhow!(
                "NCBI {} returned HTTP {}: {}",
                endpoint,
                status,
                body.chars().take(200).collect::<String>()
            ));
        }
        Ok(body)
    }

    /// Run `esearch` and return the matching UIDs
    pub async fn esearch(&self, db: &str, term: &str, retmax: u32, sort: &str) -> Result<Vec<String>> {
        let body = self
            .get_text(
                "esearch.fcgi",
                &[
                    ("db", db.to_string()),
                    ("term", term.to_string()),
                    ("retmax", retmax.to_string()),
                    ("sort", sort.to_string()),
                    ("retmode", "json".to_string()),
                ],
            )
            .await?;
        let envelope: ESearchEnvelope =
            serde_json::from_str(&body).context("parsing esearch response")?;
        Ok(envelope.esearchresult.idlist)
    }

    /// Summaries for nucleotide UIDs, in UID order
    pub async fn esummary_nucleotide(&self, ids: &[String]) -> Result<Vec<NucleotideSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = self
            .get_text(
                "esummary.fcgi",
                &[
                    ("db", "nucleotide".to_string()),
                    ("id", ids.join(",")),
                    ("retmode", "json".to_string()),
                ],
            )
            .await?;
        let value: Value = serde_json::from_str(&body).context("parsing esummary response")?;
        Ok(parse_nucleotide_summaries(&value))
    }

    /// Search the nucleotide database.
    ///
    /// Gene-like queries are tried against RefSeq first; when that finds
    /// nothing the raw query is used.
    pub async fn search_nucleotide(&self, query: &str, retmax: u32) -> Result<Vec<NucleotideSummary>> {
        let mut ids = Vec::new();
        if let Some(term) = refseq_term(query) {
            ids = self.esearch("nucleotide", &term, retmax, "relevance").await?;
            if ids.is_empty() {
                debug!(query = %query, "RefSeq search empty, retrying raw query");
            }
        }
        if ids.is_empty() {
            ids = self.esearch("nucleotide", query, retmax, "relevance").await?;
        }
        self.esummary_nucleotide(&ids).await
    }

    /// Fetch one nucleotide record as FASTA. `None` when NCBI has no record.
    pub async fn fetch_fasta(&self, accession: &str) -> Result<Option<FastaRecord>> {
        let body = self
            .get_text(
                "efetch.fcgi",
                &[
                    ("db", "nucleotide".to_string()),
                    ("id", accession.to_string()),
                    ("rettype", "fasta".to_string()),
                    ("retmode", "text".to_string()),
                ],
            )
            .await?;
        let record = parse_fasta(&body);
        if record.is_none() {
            warn!(accession = %accession, "efetch returned no FASTA record");
        }
        Ok(record)
    }

    /// Fetch PubMed records in MEDLINE format
    pub async fn fetch_medline(&self, pmids: &[String]) -> Result<Vec<MedlineRecord>> {
        if pmids.is_empty() {
            return Ok(Vec::new());
        }
        let body = self
            .get_text(
                "efetch.fcgi",
                &[
                    ("db", "pubmed".to_string()),
                    ("id", pmids.join(",")),
                    ("rettype", "medline".to_string()),
                    ("retmode", "text".to_string()),
                ],
            )
            .await?;
        Ok(parse_medline(&body))
    }
}

/// RefSeq-restricted search term for gene-like queries
pub fn refseq_term(query: &str) -> Option<String> {
    let lower = query.to_lowercase();
    let gene_like = ["gene", "insulin", "human"].iter().any(|w| lower.contains(w));
    (gene_like && !lower.contains("prop")).then(|| format!("({}) AND srcdb_refseq[PROP]", query))
}

/// Map user-facing sort names onto PubMed sort keys
pub fn pubmed_sort(sort: &str) -> &'static str {
    match sort.trim().to_lowercase().as_str() {
        "pub_date" | "date" => "pub_date",
        "first_author" | "author" => "first_author",
        _ => "relevance",
    }
}

/// Extract summaries from an `esummary` JSON document
pub fn parse_nucleotide_summaries(value: &Value) -> Vec<NucleotideSummary> {
    let Some(result) = value.get("result") else {
        return Vec::new();
    };
    let uids = result
        .get("uids")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    uids.iter()
        .filter_map(Value::as_str)
        .filter_map(|uid| {
            let doc = result.get(uid)?;
            let text = |key: &str| doc.get(key).and_then(Value::as_str).unwrap_or("").to_string();
            Some(NucleotideSummary {
                accession: text("caption"),
                title: text("title"),
                id: doc
                    .get("uid")
                    .and_then(Value::as_str)
                    .unwrap_or(uid)
                    .to_string(),
                length: doc.get("slen").and_then(Value::as_u64).unwrap_or(0),
            })
        })
        .collect()
}

/// Parse the first record of a FASTA document
pub fn parse_fasta(text: &str) -> Option<FastaRecord> {
    let mut lines = text.lines().skip_while(|l| !l.starts_with('>'));
    let header = lines.next()?[1..].trim().to_string();
    let sequence: String = lines
        .take_while(|l| !l.starts_with('>'))
        .flat_map(|l| l.split_whitespace())
        .collect::<String>()
        .to_uppercase();
    if sequence.is_empty() {
        return None;
    }
    let id = header.split_whitespace().next().unwrap_or("").to_string();
    Some(FastaRecord {
        id,
        description: header,
        sequence,
    })
}

/// Parse a MEDLINE text document into records
///
/// ```text
/// PMID- 12345678
/// TI  - A long title that
///       continues here.
/// AU  - Doe J
/// ```
pub fn parse_medline(text: &str) -> Vec<MedlineRecord> {
    let mut records = Vec::new();
    let mut current = MedlineRecord::default();
    let mut last_tag: Option<String> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            last_tag = None;
            continue;
        }

        if line.starts_with("      ") {
            if let Some(tag) = &last_tag {
                current.extend_last(tag, line.trim());
            }
            continue;
        }

        if line.get(4..6) == Some("- ") || line.get(4..) == Some("-") {
            let tag = line[..4].trim().to_string();
            let value = line.get(6..).unwrap_or("").trim();
            current.push(&tag, value);
            last_tag = Some(tag);
        }
    }

    if !current.is_empty() {
        records.push(current);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    const MEDLINE: &str = "\nPMID- 11111111\nTI  - CRISPR screens in\n      human cells.\nAU  - Doe J\nAU  - Roe R\nAID - 10.1000/xyz123 [doi]\nAID - S0000 [pii]\nDP  - 2021 Mar 4\n\nPMID- 22222222\nTI  - Second paper.\nAB  - Short abstract.\n";

    #[test]
    fn test_parse_medline() {
        let records = parse_medline(MEDLINE);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.first("PMID"), Some("11111111"));
        assert_eq!(first.first("TI"), Some("CRISPR screens in human cells."));
        assert_eq!(first.all("AU"), ["Doe J", "Roe R"]);
        assert_eq!(first.all("AID").len(), 2);
        assert_eq!(first.first("DP"), Some("2021 Mar 4"));
        assert!(first.all("MH").is_empty());

        assert_eq!(records[1].first("AB"), Some("Short abstract."));
    }

    #[test]
    fn test_parse_fasta() {
        let text = ">NM_000207.3 Homo sapiens insulin (INS), mRNA\nagccctccag\nGACAGGCTGC\n\n";
        let record = parse_fasta(text).unwrap();
        assert_eq!(record.id, "NM_000207.3");
        assert_eq!(record.description, "NM_000207.3 Homo sapiens insulin (INS), mRNA");
        assert_eq!(record.sequence, "AGCCCTCCAGGACAGGCTGC");

        assert!(parse_fasta("Error: ID list is empty!").is_none());
        assert!(parse_fasta(">empty\n").is_none());
    }

    #[test]
    fn test_parse_nucleotide_summaries() {
        let doc = json!({
            "result": {
                "uids": ["123", "456"],
                "123": {"uid": "123", "caption": "NM_000207", "title": "Insulin", "slen": 465},
                "456": {"uid": "456", "caption": "NG_007114", "title": "INS gene", "slen": 7000}
            }
        });
        let summaries = parse_nucleotide_summaries(&doc);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].accession, "NM_000207");
        assert_eq!(summaries[1].length, 7000);
        assert!(parse_nucleotide_summaries(&json!({"error": "x"})).is_empty());
    }

    #[test]
    fn test_refseq_term() {
        assert_eq!(
            refseq_term("human insulin").as_deref(),
            Some("(human insulin) AND srcdb_refseq[PROP]")
        );
        assert!(refseq_term("pUC19").is_none());
        assert!(refseq_term("human AND biomol_mrna[PROP]").is_none());
    }

    #[test]
    fn test_pubmed_sort() {
        assert_eq!(pubmed_sort("date"), "pub_date");
        assert_eq!(pubmed_sort("author"), "first_author");
        assert_eq!(pubmed_sort("first_author"), "first_author");
        assert_eq!(pubmed_sort("whatever"), "relevance");
    }

    #[tokio::test]
    async fn test_search_nucleotide_falls_back_to_raw_query() {
        async fn esearch(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
            let ids: Vec<&str> = if q["term"].contains("srcdb_refseq") {
                vec![]
            } else {
                vec!["42"]
            };
            Json(json!({"esearchresult": {"count": ids.len().to_string(), "idlist": ids}}))
        }
        async fn esummary(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
            assert_eq!(q["id"], "42");
            assert_eq!(q["tool"], "unibio");
            Json(json!({"result": {"uids": ["42"], "42": {"uid": "42", "caption": "X1", "title": "t", "slen": 10}}}))
        }

        let app = Router::new()
            .route("/esearch.fcgi", get(esearch))
            .route("/esummary.fcgi", get(esummary));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = EntrezClient::new(None, None, Duration::from_secs(5))
            .unwrap()
            .with_base_url(format!("http://{}", addr));
        let results = client.search_nucleotide("human gene X", 3).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].accession, "X1");
    }
}
