//! NCBI nucleotide database tools

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::warn;

use super::{ensure_range, typed_args};
use crate::entrez::EntrezClient;
use crate::schema::{ParamKind, ParamSpec, ToolSchema};
use crate::tool::Tool;
use unibio_core::LatencyClass;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    retmax: i64,
}

pub struct SearchNcbiNucleotideTool {
    schema: ToolSchema,
    entrez: Arc<EntrezClient>,
}

impl SearchNcbiNucleotideTool {
    pub fn new(entrez: Arc<EntrezClient>) -> Self {
        let schema = ToolSchema::new(
            "search_ncbi_nucleotide",
            "Search the NCBI Nucleotide database for DNA/RNA sequences. Gene queries are \
             matched against curated RefSeq records first. Returns accession IDs, titles and \
             sequence lengths.",
        )
        .param(ParamSpec::required(
            "query",
            ParamKind::String,
            "Search term, e.g. 'human insulin mRNA' or 'pUC19 cloning vector'",
        ))
        .param(ParamSpec::optional(
            "retmax",
            ParamKind::Integer,
            "Maximum number of results to return (1-100).",
            json!(5),
        ));
        Self { schema, entrez }
    }
}

#[async_trait]
impl Tool for SearchNcbiNucleotideTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn latency(&self) -> LatencyClass {
        LatencyClass::Slow
    }

    fn category(&self) -> &str {
        "ncbi"
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let args: SearchArgs = typed_args(args)?;
        let query = args.query.trim();
        if query.is_empty() {
            bail!("query must not be empty");
        }
        ensure_range("retmax", args.retmax, 1, 100)?;

        let results = self.entrez.search_nucleotide(query, args.retmax as u32).await?;
        Ok(json!({
            "success": true,
            "message": format!("Found {} results", results.len()),
            "results": results,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct FetchArgs {
    accession_id: String,
}

pub struct FetchNcbiSequenceTool {
    schema: ToolSchema,
    entrez: Arc<EntrezClient>,
}

impl FetchNcbiSequenceTool {
    pub fn new(entrez: Arc<EntrezClient>) -> Self {
        let schema = ToolSchema::new(
            "fetch_ncbi_sequence",
            "Fetch the full nucleotide sequence for an NCBI accession ID in FASTA form. Use \
             after search_ncbi_nucleotide to retrieve a template for primer design.",
        )
        .param(ParamSpec::required(
            "accession_id",
            ParamKind::String,
            "NCBI accession ID, e.g. 'NM_000207'",
        ));
        Self { schema, entrez }
    }
}

#[async_trait]
impl Tool for FetchNcbiSequenceTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn latency(&self) -> LatencyClass {
        LatencyClass::Slow
    }

    fn category(&self) -> &str {
        "ncbi"
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let args: FetchArgs = typed_args(args)?;
        let accession = args.accession_id.trim();
        if accession.is_empty() {
            bail!("accession_id must not be empty");
        }

        match self.entrez.fetch_fasta(accession).await {
            Ok(Some(record)) => Ok(json!({
                "success": true,
                "accession": record.id,
                "description": record.description,
                "length": record.sequence.len(),
                "sequence": record.sequence,
                "message": "Successfully fetched sequence",
            })),
            Ok(None) => Ok(json!({
                "success": false,
                "message": "Could not fetch sequence",
            })),
            Err(e) => {
                warn!(accession = %accession, "Sequence fetch failed: {:#}", e);
                Ok(json!({
                    "success": false,
                    "message": "Could not fetch sequence",
                    "error": format!("{:#}", e),
                }))
            }
        }
    }
}
