//! Gibson assembly primer construction
//!
//! The insert is placed into a vector opened between its last and first
//! base. Each primer is a vector-homology tail followed by an insert-binding
//! region of fixed length.

use serde::Serialize;

use crate::error::{BioError, Result};
use crate::sequence::reverse_complement;

pub const INSERT_BINDING_LEN: usize = 20;
pub const MIN_OVERLAP: usize = 15;
pub const MAX_OVERLAP: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GibsonPrimers {
    pub forward_primer: String,
    pub reverse_primer: String,
    pub overlap_length: usize,
}

impl GibsonPrimers {
    pub fn vector_overlap_fwd(&self) -> &str {
        &self.forward_primer[..self.overlap_length]
    }

    pub fn vector_overlap_rev(&self) -> &str {
        &self.reverse_primer[..self.overlap_length]
    }

    pub fn insert_binding_fwd(&self) -> &str {
        &self.forward_primer[self.overlap_length..]
    }

    pub fn insert_binding_rev(&self) -> &str {
        &self.reverse_primer[self.overlap_length..]
    }
}

/// Build forward and reverse primers for cloning `insert` into `vector`.
///
/// forward = last `overlap` nt of the vector + first 20 nt of the insert
/// reverse = revcomp(first `overlap` nt of the vector) + revcomp(last 20 nt of the insert)
pub fn design_gibson_primers(vector: &str, insert: &str, overlap: usize) -> Result<GibsonPrimers> {
    if !(MIN_OVERLAP..=MAX_OVERLAP).contains(&overlap) {
        return Err(BioError::InvalidParameter(format!(
            "overlap_length must be between {} and {} (got {})",
            MIN_OVERLAP, MAX_OVERLAP, overlap
        )));
    }
    if vector.len() < overlap {
        return Err(BioError::TooShort {
            what: "vector_seq",
            min: overlap,
            actual: vector.len(),
        });
    }
    if insert.len() < INSERT_BINDING_LEN {
        return Err(BioError::TooShort {
            what: "insert_seq",
            min: INSERT_BINDING_LEN,
            actual: insert.len(),
        });
    }

    let vector_tail = &vector[vector.len() - overlap..];
    let vector_head = &vector[..overlap];
    let insert_head = &insert[..INSERT_BINDING_LEN];
    let insert_tail = &insert[insert.len() - INSERT_BINDING_LEN..];

    Ok(GibsonPrimers {
        forward_primer: format!("{}{}", vector_tail, insert_head),
        reverse_primer: format!(
            "{}{}",
            reverse_complement(vector_head),
            reverse_complement(insert_tail)
        ),
        overlap_length: overlap,
    })
}
