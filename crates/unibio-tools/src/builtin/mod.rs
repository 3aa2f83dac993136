//! Built-in molecular-biology tools
//!
//! Registration order here is the order the tools are advertised to the
//! model and listed over HTTP.

mod cloning;
mod ncbi;
mod primers;
mod pubmed;

pub use cloning::{DesignGibsonPrimersTool, FindRestrictionSitesTool};
pub use ncbi::{FetchNcbiSequenceTool, SearchNcbiNucleotideTool};
pub use primers::{
    AnalyzePrimerTool, CheckPrimerCompatibilityTool, CheckSpecificityTool, DesignPrimersTool,
};
pub use pubmed::{FetchPaperDetailsTool, SearchResearchPapersTool};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::sync::Arc;

use crate::entrez::EntrezClient;
use crate::registry::ToolRegistry;

/// Register all ten built-in tools
pub fn register_builtin_tools(registry: &mut ToolRegistry, entrez: Arc<EntrezClient>) -> Result<()> {
    registry.register(Arc::new(DesignPrimersTool::new()))?;
    registry.register(Arc::new(AnalyzePrimerTool::new()))?;
    registry.register(Arc::new(CheckPrimerCompatibilityTool::new()))?;
    registry.register(Arc::new(CheckSpecificityTool::new()))?;
    registry.register(Arc::new(FindRestrictionSitesTool::new()))?;
    registry.register(Arc::new(DesignGibsonPrimersTool::new()))?;
    registry.register(Arc::new(SearchNcbiNucleotideTool::new(entrez.clone())))?;
    registry.register(Arc::new(FetchNcbiSequenceTool::new(entrez.clone())))?;
    registry.register(Arc::new(SearchResearchPapersTool::new(entrez.clone())))?;
    registry.register(Arc::new(FetchPaperDetailsTool::new(entrez)))?;
    Ok(())
}

/// Deserialize already-decoded arguments into a typed struct
fn typed_args<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args)).context("malformed arguments")
}

fn ensure_range<T>(name: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + Display,
{
    if value < min || value > max {
        bail!("{} must be between {} and {} (got {})", name, min, max, value);
    }
    Ok(())
}

fn ensure_ordered<T>(low_name: &str, low: T, high_name: &str, high: T) -> Result<()>
where
    T: PartialOrd + Display,
{
    if high <= low {
        bail!("{} ({}) must be greater than {} ({})", high_name, high, low_name, low);
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::executor;

    #[test]
    fn test_registers_all_tools_in_order() {
        let executor = executor();
        assert_eq!(
            executor.registry().names(),
            vec![
                "design_primers",
                "analyze_primer",
                "check_primer_compatibility",
                "check_specificity",
                "find_restriction_sites",
                "design_gibson_primers",
                "search_ncbi_nucleotide",
                "fetch_ncbi_sequence",
                "search_research_papers",
                "fetch_paper_details",
            ]
        );
    }

    #[test]
    fn test_ranges() {
        assert!(super::ensure_range("min_tm", 57.0, 40.0, 80.0).is_ok());
        let err = super::ensure_range("min_tm", 90.0, 40.0, 80.0).unwrap_err();
        assert_eq!(err.to_string(), "min_tm must be between 40 and 80 (got 90)");
        let err = super::ensure_ordered("prod_min", 300, "prod_max", 100).unwrap_err();
        assert_eq!(err.to_string(), "prod_max (100) must be greater than prod_min (300)");
    }
}
