//! DNA sequence helpers (IUPAC alphabet)

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{BioError, Result};

/// Accepted nucleotide codes
pub const IUPAC_DNA: &str = "ATGCNRYSWKMBDHV";

lazy_static! {
    static ref INVALID_BASE: Regex = Regex::new("[^ATGCNRYSWKMBDHV]").expect("static regex");
}

/// Trim, upper-case and validate a sequence.
///
/// `what` names the field in error messages ("sequence", "vector_seq", ...).
pub fn normalize(raw: &str, what: &'static str) -> Result<String> {
    let seq = raw.trim().to_uppercase();
    if seq.is_empty() {
        return Err(BioError::EmptySequence { what });
    }

    let mut invalid: Vec<char> = INVALID_BASE
        .find_iter(&seq)
        .filter_map(|m| m.as_str().chars().next())
        .collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        invalid.dedup();
        return Err(BioError::InvalidSequence {
            what,
            chars: invalid.into_iter().collect(),
        });
    }

    Ok(seq)
}

/// Complement of a single IUPAC base. Unknown bytes map to `N`.
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'R' => b'Y',
        b'Y' => b'R',
        b'S' => b'S',
        b'W' => b'W',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        _ => b'N',
    }
}

pub fn reverse_complement(seq: &str) -> String {
    seq.bytes().rev().map(|b| complement(b) as char).collect()
}

/// GC content as a percentage. S counts as GC; other ambiguity codes do not.
pub fn gc_percent(seq: &str) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let gc = seq
        .bytes()
        .filter(|b| matches!(b, b'G' | b'C' | b'S'))
        .count();
    gc as f64 * 100.0 / seq.len() as f64
}

/// Length of the longest single-base run ("poly-X").
pub fn max_homopolymer(seq: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    let mut prev = None;
    for b in seq.bytes() {
        if Some(b) == prev {
            run += 1;
        } else {
            run = 1;
            prev = Some(b);
        }
        longest = longest.max(run);
    }
    longest
}

/// True when the sequence only uses A, C, G and T.
pub fn is_unambiguous(seq: &str) -> bool {
    seq.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
}

/// Whether a concrete base satisfies an IUPAC code.
pub fn iupac_matches(code: u8, base: u8) -> bool {
    let allowed: &[u8] = match code {
        b'A' => b"A",
        b'C' => b"C",
        b'G' => b"G",
        b'T' => b"T",
        b'R' => b"AG",
        b'Y' => b"CT",
        b'S' => b"CG",
        b'W' => b"AT",
        b'K' => b"GT",
        b'M' => b"AC",
        b'B' => b"CGT",
        b'D' => b"AGT",
        b'H' => b"ACT",
        b'V' => b"ACG",
        b'N' => b"ACGT",
        _ => b"",
    };
    allowed.contains(&base)
}
