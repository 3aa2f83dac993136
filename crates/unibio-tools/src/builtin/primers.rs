//! PCR primer tools: design, analysis, pair compatibility, specificity

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{ensure_ordered, ensure_range, typed_args};
use crate::schema::{ParamKind, ParamSpec, ToolSchema};
use crate::tool::Tool;
use unibio_bio::sequence::normalize;
use unibio_bio::{
    check_specificity, design_primers, dimer_tm, hairpin_tm, melting_temp, BioError,
    PrimerDesignParams,
};

/// Hairpin and dimer structures above this Tm interfere with PCR
const STRUCTURE_RISK_TM: f64 = 40.0;
const ANALYZE_MIN_LEN: usize = 15;
const ANALYZE_MAX_LEN: usize = 35;

// ============================================================================
// design_primers
// ============================================================================

#[derive(Debug, Deserialize)]
struct DesignArgs {
    sequence: String,
    min_tm: f64,
    max_tm: f64,
    prod_min: i64,
    prod_max: i64,
}

pub struct DesignPrimersTool {
    schema: ToolSchema,
}

impl DesignPrimersTool {
    pub fn new() -> Self {
        let schema = ToolSchema::new(
            "design_primers",
            "Design PCR primers for DNA amplification. Analyzes a DNA sequence and generates \
             optimal primer pairs based on melting temperature, GC content, and product size \
             constraints.",
        )
        .param(ParamSpec::required(
            "sequence",
            ParamKind::String,
            "The DNA sequence template (5' to 3') for which to design primers. Must contain only valid DNA bases.",
        ))
        .param(ParamSpec::optional(
            "min_tm",
            ParamKind::Number,
            "Minimum melting temperature (°C) for primers. Typical range: 50-65°C.",
            json!(57.0),
        ))
        .param(ParamSpec::optional(
            "max_tm",
            ParamKind::Number,
            "Maximum melting temperature (°C) for primers. Must be greater than min_tm.",
            json!(63.0),
        ))
        .param(ParamSpec::optional(
            "prod_min",
            ParamKind::Integer,
            "Minimum PCR product size in base pairs.",
            json!(100),
        ))
        .param(ParamSpec::optional(
            "prod_max",
            ParamKind::Integer,
            "Maximum PCR product size in base pairs. Must be greater than prod_min.",
            json!(300),
        ));
        Self { schema }
    }
}

impl Default for DesignPrimersTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DesignPrimersTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn category(&self) -> &str {
        "primers"
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let args: DesignArgs = typed_args(args)?;
        ensure_range("min_tm", args.min_tm, 40.0, 80.0)?;
        ensure_range("max_tm", args.max_tm, 40.0, 80.0)?;
        ensure_ordered("min_tm", args.min_tm, "max_tm", args.max_tm)?;
        ensure_range("prod_min", args.prod_min, 50, 5000)?;
        ensure_range("prod_max", args.prod_max, 50, 5000)?;
        ensure_ordered("prod_min", args.prod_min, "prod_max", args.prod_max)?;

        let template = normalize(&args.sequence, "sequence")?;
        let params = PrimerDesignParams::default()
            .with_tm_range(args.min_tm, args.max_tm)
            .with_product_range(args.prod_min as usize, args.prod_max as usize);

        // the candidate scan is CPU bound
        let pairs = tokio::task::spawn_blocking(move || design_primers(&template, &params))
            .await
            .context("primer design task failed")??;

        let message = if pairs.is_empty() {
            "No suitable primers found.".to_string()
        } else {
            format!("Found {} primer pair(s)", pairs.len())
        };
        Ok(json!({
            "success": !pairs.is_empty(),
            "primer_pairs": pairs,
            "message": message,
        }))
    }
}

// ============================================================================
// analyze_primer
// ============================================================================

#[derive(Debug, Deserialize)]
struct SequenceArgs {
    sequence: String,
}

pub struct AnalyzePrimerTool {
    schema: ToolSchema,
}

impl AnalyzePrimerTool {
    pub fn new() -> Self {
        let schema = ToolSchema::new(
            "analyze_primer",
            "Analyze a single primer sequence for thermodynamic properties. Returns melting \
             temperature (Tm), hairpin formation potential, and homodimer formation potential.",
        )
        .param(ParamSpec::required(
            "sequence",
            ParamKind::String,
            "The primer sequence (5' to 3') to analyze. Must be 15-35 bases long.",
        ));
        Self { schema }
    }
}

impl Default for AnalyzePrimerTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for AnalyzePrimerTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn category(&self) -> &str {
        "primers"
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let args: SequenceArgs = typed_args(args)?;
        let seq = normalize(&args.sequence, "sequence")?;
        if seq.len() < ANALYZE_MIN_LEN {
            return Err(BioError::TooShort {
                what: "sequence",
                min: ANALYZE_MIN_LEN,
                actual: seq.len(),
            }
            .into());
        }
        if seq.len() > ANALYZE_MAX_LEN {
            return Err(BioError::TooLong {
                what: "sequence",
                max: ANALYZE_MAX_LEN,
                actual: seq.len(),
            }
            .into());
        }

        let tm = melting_temp(&seq);
        let hairpin = hairpin_tm(&seq);
        let homodimer = dimer_tm(&seq, &seq);

        let mut warnings = Vec::new();
        if hairpin > STRUCTURE_RISK_TM {
            warnings.push(format!("High hairpin risk (Tm: {}°C)", hairpin));
        }
        if homodimer > STRUCTURE_RISK_TM {
            warnings.push(format!("High homodimer risk (Tm: {}°C)", homodimer));
        }
        if !(50.0..=65.0).contains(&tm) {
            warnings.push(format!("Tm {}°C is outside the typical 50-65°C range", tm));
        }

        Ok(json!({
            "sequence": seq,
            "tm": tm,
            "hairpin_tm": hairpin,
            "homodimer_tm": homodimer,
            "warnings": warnings,
        }))
    }
}

// ============================================================================
// check_primer_compatibility
// ============================================================================

#[derive(Debug, Deserialize)]
struct PairArgs {
    forward_seq: String,
    reverse_seq: String,
}

pub struct CheckPrimerCompatibilityTool {
    schema: ToolSchema,
}

impl CheckPrimerCompatibilityTool {
    pub fn new() -> Self {
        let schema = ToolSchema::new(
            "check_primer_compatibility",
            "Check if two primers (forward and reverse) will form primer-dimers. Evaluates \
             heterodimer formation between a primer pair.",
        )
        .param(ParamSpec::required(
            "forward_seq",
            ParamKind::String,
            "Forward primer sequence (5' to 3')",
        ))
        .param(ParamSpec::required(
            "reverse_seq",
            ParamKind::String,
            "Reverse primer sequence (5' to 3')",
        ));
        Self { schema }
    }
}

impl Default for CheckPrimerCompatibilityTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CheckPrimerCompatibilityTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn category(&self) -> &str {
        "primers"
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let args: PairArgs = typed_args(args)?;
        let forward = normalize(&args.forward_seq, "forward_seq")?;
        let reverse = normalize(&args.reverse_seq, "reverse_seq")?;

        let tm = dimer_tm(&forward, &reverse);
        let has_dimer_risk = tm > STRUCTURE_RISK_TM;
        let recommendation = if has_dimer_risk {
            format!("⚠️ High dimer risk (Tm: {}°C). Consider redesigning.", tm)
        } else {
            "✓ Primers are compatible".to_string()
        };

        Ok(json!({
            "has_dimer_risk": has_dimer_risk,
            "dimer_tm": tm,
            "recommendation": recommendation,
        }))
    }
}

// ============================================================================
// check_specificity
// ============================================================================

#[derive(Debug, Deserialize)]
struct SpecificityArgs {
    primer_seq: String,
    template_seq: String,
}

pub struct CheckSpecificityTool {
    schema: ToolSchema,
}

impl CheckSpecificityTool {
    pub fn new() -> Self {
        let schema = ToolSchema::new(
            "check_specificity",
            "Check if a primer binds specifically to a template sequence (exactly once). \
             Searches both DNA strands and handles circular plasmid topology.",
        )
        .param(ParamSpec::required(
            "primer_seq",
            ParamKind::String,
            "The primer sequence to check",
        ))
        .param(ParamSpec::required(
            "template_seq",
            ParamKind::String,
            "The template/plasmid sequence to search against",
        ));
        Self { schema }
    }
}

impl Default for CheckSpecificityTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CheckSpecificityTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn category(&self) -> &str {
        "primers"
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let args: SpecificityArgs = typed_args(args)?;
        let primer = normalize(&args.primer_seq, "primer_seq")?;
        let template = normalize(&args.template_seq, "template_seq")?;

        let result = check_specificity(&primer, &template);
        let recommendation = match result.count {
            1 => "✓ Primer is specific (binds exactly once)".to_string(),
            0 => "⚠️ Primer does not bind to template".to_string(),
            n => format!("⚠️ Non-specific: binds {} times.", n),
        };

        Ok(json!({
            "is_specific": result.is_specific,
            "count": result.count,
            "warning": result.warning,
            "recommendation": recommendation,
        }))
    }
}
