//! Cloning tools: restriction mapping and Gibson assembly primers

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{ensure_range, typed_args};
use crate::schema::{ParamKind, ParamSpec, ToolSchema};
use crate::tool::Tool;
use unibio_bio::gibson::{MAX_OVERLAP, MIN_OVERLAP};
use unibio_bio::sequence::normalize;
use unibio_bio::{design_gibson_primers, find_restriction_sites, BioError};

const MIN_SCAN_LEN: usize = 6;

#[derive(Debug, Deserialize)]
struct ScanArgs {
    sequence: String,
}

pub struct FindRestrictionSitesTool {
    schema: ToolSchema,
}

impl FindRestrictionSitesTool {
    pub fn new() -> Self {
        let schema = ToolSchema::new(
            "find_restriction_sites",
            "Scan a DNA sequence for restriction enzyme recognition sites. Searches for common \
             commercially available enzymes and reports every cut position.",
        )
        .param(ParamSpec::required(
            "sequence",
            ParamKind::String,
            "DNA sequence to scan for restriction sites. Must be at least 6 bases long.",
        ));
        Self { schema }
    }
}

impl Default for FindRestrictionSitesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FindRestrictionSitesTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn category(&self) -> &str {
        "cloning"
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let args: ScanArgs = typed_args(args)?;
        let seq = normalize(&args.sequence, "sequence")?;
        if seq.len() < MIN_SCAN_LEN {
            return Err(BioError::TooShort {
                what: "sequence",
                min: MIN_SCAN_LEN,
                actual: seq.len(),
            }
            .into());
        }

        let hits = find_restriction_sites(&seq);
        Ok(json!({
            "total_enzymes_found": hits.len(),
            "message": format!("Found {} enzyme(s) that cut this sequence", hits.len()),
            "enzymes": hits,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct GibsonArgs {
    vector_seq: String,
    insert_seq: String,
    overlap_length: i64,
}

pub struct DesignGibsonPrimersTool {
    schema: ToolSchema,
}

impl DesignGibsonPrimersTool {
    pub fn new() -> Self {
        let schema = ToolSchema::new(
            "design_gibson_primers",
            "Design primers for Gibson assembly cloning. Generates primers with homology \
             overhangs to seamlessly join an insert into a vector.",
        )
        .param(ParamSpec::required(
            "vector_seq",
            ParamKind::String,
            "Vector sequence (linearized at insertion site)",
        ))
        .param(ParamSpec::required(
            "insert_seq",
            ParamKind::String,
            "Insert sequence to clone into the vector",
        ))
        .param(ParamSpec::optional(
            "overlap_length",
            ParamKind::Integer,
            "Length of homology overlap in base pairs. Recommended: 15-40bp.",
            json!(25),
        ));
        Self { schema }
    }
}

impl Default for DesignGibsonPrimersTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DesignGibsonPrimersTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn category(&self) -> &str {
        "cloning"
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let args: GibsonArgs = typed_args(args)?;
        ensure_range(
            "overlap_length",
            args.overlap_length,
            MIN_OVERLAP as i64,
            MAX_OVERLAP as i64,
        )?;
        let vector = normalize(&args.vector_seq, "vector_seq")?;
        let insert = normalize(&args.insert_seq, "insert_seq")?;

        let primers = design_gibson_primers(&vector, &insert, args.overlap_length as usize)?;
        Ok(json!({
            "forward_primer": primers.forward_primer,
            "reverse_primer": primers.reverse_primer,
            "overlap_length": primers.overlap_length,
            "vector_overlap_fwd": primers.vector_overlap_fwd(),
            "vector_overlap_rev": primers.vector_overlap_rev(),
            "insert_binding_fwd": primers.insert_binding_fwd(),
            "insert_binding_rev": primers.insert_binding_rev(),
            "message": format!(
                "Gibson assembly primers designed with {}bp overlaps",
                primers.overlap_length
            ),
        }))
    }
}
