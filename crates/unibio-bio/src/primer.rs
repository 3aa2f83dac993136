//! PCR primer pair design
//!
//! Candidate primers are scored with a primer3-style penalty (distance from
//! the optimal Tm plus distance from the optimal length). Each template
//! position keeps its best-scoring length, then left/right candidates are
//! paired inside the requested product-size window. A pair's penalty is the
//! sum of its primers' penalties plus their Tm difference; the lowest-penalty
//! pairs are returned.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

use crate::error::{BioError, Result};
use crate::sequence::{gc_percent, is_unambiguous, max_homopolymer, reverse_complement};
use crate::thermo::{melting_temp, round2};

#[derive(Debug, Clone, PartialEq)]
pub struct PrimerDesignParams {
    pub min_tm: f64,
    pub max_tm: f64,
    pub opt_tm: f64,
    pub min_size: usize,
    pub opt_size: usize,
    pub max_size: usize,
    pub min_gc: f64,
    pub max_gc: f64,
    pub max_poly_x: usize,
    pub product_min: usize,
    pub product_max: usize,
    pub num_return: usize,
}

impl Default for PrimerDesignParams {
    fn default() -> Self {
        Self {
            min_tm: 57.0,
            max_tm: 63.0,
            opt_tm: 60.0,
            min_size: 18,
            opt_size: 20,
            max_size: 25,
            min_gc: 20.0,
            max_gc: 80.0,
            max_poly_x: 5,
            product_min: 100,
            product_max: 300,
            num_return: 5,
        }
    }
}

impl PrimerDesignParams {
    pub fn with_tm_range(mut self, min_tm: f64, max_tm: f64) -> Self {
        self.min_tm = min_tm;
        self.max_tm = max_tm;
        self
    }

    pub fn with_product_range(mut self, min: usize, max: usize) -> Self {
        self.product_min = min;
        self.product_max = max;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.min_tm >= self.max_tm {
            return Err(BioError::InvalidParameter(format!(
                "max_tm ({}) must be greater than min_tm ({})",
                self.max_tm, self.min_tm
            )));
        }
        if self.product_min >= self.product_max {
            return Err(BioError::InvalidParameter(format!(
                "prod_max ({}) must be greater than prod_min ({})",
                self.product_max, self.product_min
            )));
        }
        if self.min_size > self.max_size || self.min_size < 2 {
            return Err(BioError::InvalidParameter(format!(
                "invalid primer size range {}-{}",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimerPair {
    pub pair_id: usize,
    pub left_sequence: String,
    pub right_sequence: String,
    pub left_tm: f64,
    pub right_tm: f64,
    pub left_gc: f64,
    pub right_gc: f64,
    pub product_size: usize,
    pub penalty: f64,
    /// 0-based start of the left primer on the template
    #[serde(skip)]
    pub left_start: usize,
    /// 0-based start of the right primer's binding site on the template
    #[serde(skip)]
    pub right_start: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    /// Left: first template index. Right: template index one past the 3' binding end.
    anchor: usize,
    sequence: String,
    tm: f64,
    gc: f64,
    penalty: f64,
}

impl Candidate {
    fn len(&self) -> usize {
        self.sequence.len()
    }
}

fn score(oligo: &str, params: &PrimerDesignParams) -> Option<(f64, f64, f64)> {
    if !is_unambiguous(oligo) || max_homopolymer(oligo) > params.max_poly_x {
        return None;
    }
    let gc = gc_percent(oligo);
    if gc < params.min_gc || gc > params.max_gc {
        return None;
    }
    let tm = melting_temp(oligo);
    if tm < params.min_tm || tm > params.max_tm {
        return None;
    }
    let penalty = (tm - params.opt_tm).abs() + (oligo.len() as f64 - params.opt_size as f64).abs();
    Some((tm, gc, penalty))
}

fn pick_best(options: impl Iterator<Item = Candidate>) -> Option<Candidate> {
    options.min_by(|a, b| a.penalty.total_cmp(&b.penalty))
}

fn left_candidates(template: &str, params: &PrimerDesignParams) -> Vec<Candidate> {
    let n = template.len();
    (0..n)
        .filter_map(|start| {
            pick_best((params.min_size..=params.max_size).filter_map(|len| {
                let oligo = template.get(start..start + len)?;
                let (tm, gc, penalty) = score(oligo, params)?;
                Some(Candidate {
                    anchor: start,
                    sequence: oligo.to_string(),
                    tm,
                    gc,
                    penalty,
                })
            }))
        })
        .collect()
}

fn right_candidates(template: &str, params: &PrimerDesignParams) -> Vec<Candidate> {
    let n = template.len();
    (1..=n)
        .filter_map(|end| {
            pick_best((params.min_size..=params.max_size).filter_map(|len| {
                let site = template.get(end.checked_sub(len)?..end)?;
                let oligo = reverse_complement(site);
                let (tm, gc, penalty) = score(&oligo, params)?;
                Some(Candidate {
                    anchor: end,
                    sequence: oligo,
                    tm,
                    gc,
                    penalty,
                })
            }))
        })
        .collect()
}

/// Heap entry ordered by penalty, then position, so the worst pair sits on top.
#[derive(Debug)]
struct Ranked {
    penalty: f64,
    left: usize,
    right: usize,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.penalty
            .total_cmp(&other.penalty)
            .then(self.left.cmp(&other.left))
            .then(self.right.cmp(&other.right))
    }
}

/// Design up to `params.num_return` primer pairs for `template`.
///
/// `template` must already be normalized. An empty result is not an error;
/// it means no pair satisfied the constraints.
pub fn design_primers(template: &str, params: &PrimerDesignParams) -> Result<Vec<PrimerPair>> {
    params.validate()?;

    let lefts = left_candidates(template, params);
    let rights = right_candidates(template, params);
    debug!(
        template_len = template.len(),
        lefts = lefts.len(),
        rights = rights.len(),
        "Primer candidates"
    );

    let mut heap: BinaryHeap<Ranked> = BinaryHeap::with_capacity(params.num_return + 1);
    for (li, left) in lefts.iter().enumerate() {
        for (ri, right) in rights.iter().enumerate() {
            let Some(product) = right.anchor.checked_sub(left.anchor) else {
                continue;
            };
            if product < params.product_min || product > params.product_max {
                continue;
            }
            // the primers must not overlap on the template
            if left.anchor + left.len() > right.anchor - right.len() {
                continue;
            }
            heap.push(Ranked {
                penalty: left.penalty + right.penalty + (left.tm - right.tm).abs(),
                left: li,
                right: ri,
            });
            if heap.len() > params.num_return {
                heap.pop();
            }
        }
    }

    let pairs = heap
        .into_sorted_vec()
        .into_iter()
        .enumerate()
        .map(|(pair_id, ranked)| {
            let left = &lefts[ranked.left];
            let right = &rights[ranked.right];
            PrimerPair {
                pair_id,
                left_sequence: left.sequence.clone(),
                right_sequence: right.sequence.clone(),
                left_tm: left.tm,
                right_tm: right.tm,
                left_gc: round2(left.gc),
                right_gc: round2(right.gc),
                product_size: right.anchor - left.anchor,
                penalty: (ranked.penalty * 1000.0).round() / 1000.0,
                left_start: left.anchor,
                right_start: right.anchor - right.len(),
            }
        })
        .collect();

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 5' end of the EGFP coding sequence
    const EGFP: &str = "ATGGTGAGCAAGGGCGAGGAGCTGTTCACCGGGGTGGTGCCCATCCTGGTCGAGCTGGACGGCGACGTAAACGGCCACAAGTTCAGCGTGTCCGGCGAGGGCGAGGGCGATGCCACCTACGGCAAGCTGACCCTGAAGTTCATCTGCACCACCGGCAAGCTGCCCGTGCCCTGGCCCACCCTCGTGACCACCCTGACCTACGGCGTGCAGTGCTTCAGCCGCTACCCCGACCACATGAAGCAGCACGACTTCTTCAAGTCCGCCATGCCCGAAGGCTACGTCCAGGAGCGCACCATCTTCTTCAAGGACGACGGCAACTACAAGACCCGCGCCGAGGTGAAGTTCGAGGGCGACACCCTGGTGAACCGCATCGAGCTGAAGGGCATCGACTTCAAGGAGGACGGCAACATCCTGGGG";

    #[test]
    fn test_design_primers_respects_constraints() {
        let params = PrimerDesignParams::default();
        let pairs = design_primers(EGFP, &params).unwrap();

        assert!(!pairs.is_empty());
        assert!(pairs.len() <= 5);
        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.pair_id, i);
            assert!((100..=300).contains(&pair.product_size));
            assert!((57.0..=63.0).contains(&pair.left_tm));
            assert!((57.0..=63.0).contains(&pair.right_tm));
            assert!((18..=25).contains(&pair.left_sequence.len()));
            assert_eq!(&EGFP[pair.left_start..pair.left_start + pair.left_sequence.len()], pair.left_sequence);
            let site = &EGFP[pair.right_start..pair.right_start + pair.right_sequence.len()];
            assert_eq!(reverse_complement(site), pair.right_sequence);
        }
        for window in pairs.windows(2) {
            assert!(window[0].penalty <= window[1].penalty);
        }
    }

    #[test]
    fn test_short_template_yields_nothing() {
        let pairs = design_primers("ATGCATGCATGCATGCATGCATGC", &PrimerDesignParams::default()).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_invalid_ranges() {
        let params = PrimerDesignParams::default().with_tm_range(63.0, 57.0);
        assert!(design_primers(EGFP, &params).is_err());

        let params = PrimerDesignParams::default().with_product_range(300, 100);
        assert!(design_primers(EGFP, &params).is_err());
    }
}
