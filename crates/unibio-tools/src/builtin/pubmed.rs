//! PubMed literature tools

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::warn;

use super::{ensure_range, typed_args};
use crate::entrez::{pubmed_sort, EntrezClient, MedlineRecord};
use crate::schema::{ParamKind, ParamSpec, ToolSchema};
use crate::tool::Tool;
use unibio_core::LatencyClass;

const PREVIEW_CHARS: usize = 300;
const LISTED_AUTHORS: usize = 3;

fn pubmed_url(pmid: &str) -> String {
    if pmid.is_empty() {
        String::new()
    } else {
        format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)
    }
}

fn doi(record: &MedlineRecord) -> String {
    record
        .all("AID")
        .iter()
        .find(|aid| aid.contains("[doi]"))
        .map(|aid| aid.replace("[doi]", "").trim().to_string())
        .unwrap_or_default()
}

fn year(date: &str) -> String {
    date.get(..4).unwrap_or("").to_string()
}

fn journal(record: &MedlineRecord) -> &str {
    record
        .first("JT")
        .or_else(|| record.first("TA"))
        .unwrap_or("")
}

fn abstract_text(record: &MedlineRecord) -> Option<String> {
    let parts = record.all("AB");
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn author_summary(authors: &[String]) -> String {
    let mut summary = authors
        .iter()
        .take(LISTED_AUTHORS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if authors.len() > LISTED_AUTHORS {
        summary.push_str(&format!(
            " et al. (+{} more)",
            authors.len() - LISTED_AUTHORS
        ));
    }
    summary
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Compact search-result view of a record
fn paper_summary(record: &MedlineRecord) -> Value {
    let pmid = record.first("PMID").unwrap_or("");
    let date = record.first("DP").unwrap_or("");
    json!({
        "pmid": pmid,
        "title": record.first("TI").unwrap_or("No title available"),
        "authors": author_summary(record.all("AU")),
        "journal": journal(record),
        "journal_abbrev": record.first("TA").unwrap_or(""),
        "year": year(date),
        "date": date,
        "abstract_preview": preview(&abstract_text(record).unwrap_or_default()),
        "doi": doi(record),
        "pubmed_url": pubmed_url(pmid),
    })
}

/// Full view of a record, merged into the tool payload
fn paper_details(record: &MedlineRecord, requested_pmid: &str) -> Map<String, Value> {
    let pmid = record.first("PMID").unwrap_or(requested_pmid);
    let date = record.first("DP").unwrap_or("");
    let authors = record.all("AU");
    let details = json!({
        "pmid": pmid,
        "title": record.first("TI").unwrap_or("No title available"),
        "authors": authors.join(", "),
        "authors_list": authors,
        "journal": journal(record),
        "journal_abbrev": record.first("TA").unwrap_or(""),
        "year": year(date),
        "date": date,
        "abstract": abstract_text(record).unwrap_or_else(|| "No abstract available.".to_string()),
        "doi": doi(record),
        "pubmed_url": pubmed_url(pmid),
        "publication_type": record.all("PT"),
        "mesh_terms": record.all("MH"),
        "keywords": record.all("OT"),
        "language": record.all("LA"),
        "source": record.first("SO").unwrap_or(""),
    });
    match details {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

// ============================================================================
// search_research_papers
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    max_results: i64,
    sort: String,
}

pub struct SearchResearchPapersTool {
    schema: ToolSchema,
    entrez: Arc<EntrezClient>,
}

impl SearchResearchPapersTool {
    pub fn new(entrez: Arc<EntrezClient>) -> Self {
        let schema = ToolSchema::new(
            "search_research_papers",
            "Search PubMed for research papers. Returns titles, authors, journal, year, an \
             abstract preview, DOI and a PubMed link for each hit. Use fetch_paper_details for \
             the full abstract.",
        )
        .param(ParamSpec::required(
            "query",
            ParamKind::String,
            "Search terms, e.g. 'CRISPR cas9 gene editing' or 'Gibson assembly optimization'",
        ))
        .param(ParamSpec::optional(
            "max_results",
            ParamKind::Integer,
            "Maximum number of papers to return (1-50).",
            json!(5),
        ))
        .param(ParamSpec::optional(
            "sort",
            ParamKind::String,
            "Sort order: 'relevance', 'pub_date' (newest first) or 'first_author'.",
            json!("relevance"),
        ));
        Self { schema, entrez }
    }
}

#[async_trait]
impl Tool for SearchResearchPapersTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn latency(&self) -> LatencyClass {
        LatencyClass::Slow
    }

    fn category(&self) -> &str {
        "literature"
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let args: SearchArgs = typed_args(args)?;
        let query = args.query.trim();
        if query.is_empty() {
            bail!("query must not be empty");
        }
        ensure_range("max_results", args.max_results, 1, 50)?;

        let pmids = self
            .entrez
            .esearch("pubmed", query, args.max_results as u32, pubmed_sort(&args.sort))
            .await?;
        let records = self.entrez.fetch_medline(&pmids).await?;
        let results: Vec<Value> = records.iter().map(paper_summary).collect();

        Ok(json!({
            "success": true,
            "message": format!("Found {} papers", results.len()),
            "results": results,
        }))
    }
}

// ============================================================================
// fetch_paper_details
// ============================================================================

#[derive(Debug, Deserialize)]
struct DetailsArgs {
    pmid: String,
}

pub struct FetchPaperDetailsTool {
    schema: ToolSchema,
    entrez: Arc<EntrezClient>,
}

impl FetchPaperDetailsTool {
    pub fn new(entrez: Arc<EntrezClient>) -> Self {
        let schema = ToolSchema::new(
            "fetch_paper_details",
            "Fetch the full record of a PubMed paper: complete abstract, author list, MeSH \
             terms, keywords and citation source.",
        )
        .param(ParamSpec::required(
            "pmid",
            ParamKind::String,
            "PubMed ID, e.g. '12345678'",
        ));
        Self { schema, entrez }
    }
}

#[async_trait]
impl Tool for FetchPaperDetailsTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn latency(&self) -> LatencyClass {
        LatencyClass::Slow
    }

    fn category(&self) -> &str {
        "literature"
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let args: DetailsArgs = typed_args(args)?;
        let pmid = args.pmid.trim();
        if pmid.is_empty() {
            bail!("pmid must not be empty");
        }

        let records = match self.entrez.fetch_medline(&[pmid.to_string()]).await {
            Ok(records) => records,
            Err(e) => {
                warn!(pmid = %pmid, "Paper fetch failed: {:#}", e);
                return Ok(json!({
                    "success": false,
                    "message": "Could not fetch paper details",
                    "error": format!("{:#}", e),
                }));
            }
        };

        let Some(record) = records.first() else {
            return Ok(json!({
                "success": false,
                "message": "Could not fetch paper details",
            }));
        };

        let mut payload = paper_details(record, pmid);
        payload.insert("success".to_string(), json!(true));
        payload.insert(
            "message".to_string(),
            json!("Successfully fetched paper details"),
        );
        Ok(Value::Object(payload))
    }
}
