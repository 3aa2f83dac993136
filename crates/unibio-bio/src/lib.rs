//! unibio-bio: deterministic molecular-biology computations
//!
//! Everything here is synchronous and side-effect free. The tool layer
//! (`unibio-tools`) wraps these functions with argument decoding and
//! result shaping.

pub mod error;
pub mod gibson;
pub mod primer;
pub mod restriction;
pub mod sequence;
pub mod specificity;
pub mod thermo;

pub use error::{BioError, Result};
pub use gibson::{design_gibson_primers, GibsonPrimers};
pub use primer::{design_primers, PrimerDesignParams, PrimerPair};
pub use restriction::{find_restriction_sites, Enzyme, RestrictionHit};
pub use specificity::{check_specificity, Specificity};
pub use thermo::{dimer_tm, hairpin_tm, melting_temp, round2};
