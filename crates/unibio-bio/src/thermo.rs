//! Nearest-neighbor duplex thermodynamics
//!
//! Unified SantaLucia (1998) parameters with the SantaLucia salt correction
//! and the von Ahsen Mg2+ to Na+ equivalence. Defaults mirror common PCR
//! conditions: 50 mM monovalent, 1.5 mM Mg2+, 0.6 mM dNTP, 50 nM oligo.
//!
//! Hairpin and dimer temperatures are estimated from the most stable
//! contiguous complementary stem (at least four base pairs); when no such
//! stem exists the temperature is reported as 0.0.

use crate::sequence::reverse_complement;

const R: f64 = 1.987;
const KELVIN: f64 = 273.15;
const T37: f64 = 310.15;

const MONOVALENT_MM: f64 = 50.0;
const DIVALENT_MM: f64 = 1.5;
const DNTP_MM: f64 = 0.6;
const OLIGO_NM: f64 = 50.0;

const MIN_STEM: usize = 4;
const MIN_LOOP: usize = 3;

/// Stack used for any dinucleotide that contains an ambiguity code
/// (mean of the 16 unambiguous stacks).
const AMBIGUOUS_STACK: (f64, f64) = (-8.275, -22.13);

/// (dH kcal/mol, dS cal/K/mol) for the 5'->3' dinucleotide `a b`.
fn stack(a: u8, b: u8) -> (f64, f64) {
    match (a, b) {
        (b'A', b'A') | (b'T', b'T') => (-7.9, -22.2),
        (b'A', b'T') => (-7.2, -20.4),
        (b'T', b'A') => (-7.2, -21.3),
        (b'C', b'A') | (b'T', b'G') => (-8.5, -22.7),
        (b'G', b'T') | (b'A', b'C') => (-8.4, -22.4),
        (b'C', b'T') | (b'A', b'G') => (-7.8, -21.0),
        (b'G', b'A') | (b'T', b'C') => (-8.2, -22.2),
        (b'C', b'G') => (-10.6, -27.2),
        (b'G', b'C') => (-9.8, -24.4),
        (b'G', b'G') | (b'C', b'C') => (-8.0, -19.9),
        _ => AMBIGUOUS_STACK,
    }
}

fn terminal(base: u8) -> (f64, f64) {
    match base {
        b'G' | b'C' => (0.1, -2.8),
        _ => (2.3, 4.1),
    }
}

/// Sodium-equivalent concentration in mol/L.
fn sodium_equivalent() -> f64 {
    let free_mg = (DIVALENT_MM - DNTP_MM).max(0.0);
    (MONOVALENT_MM + 120.0 * free_mg.sqrt()) / 1000.0
}

/// Duplex dH (kcal/mol) and salt-corrected dS (cal/K/mol).
fn duplex(seq: &[u8]) -> (f64, f64) {
    let mut dh = 0.0;
    let mut ds = 0.0;
    for pair in seq.windows(2) {
        let (h, s) = stack(pair[0], pair[1]);
        dh += h;
        ds += s;
    }
    if let (Some(&first), Some(&last)) = (seq.first(), seq.last()) {
        for (h, s) in [terminal(first), terminal(last)] {
            dh += h;
            ds += s;
        }
    }
    ds += 0.368 * (seq.len().saturating_sub(1)) as f64 * sodium_equivalent().ln();
    (dh, ds)
}

fn is_self_complementary(seq: &str) -> bool {
    reverse_complement(seq) == seq
}

fn bimolecular_tm(dh: f64, ds: f64, self_complementary: bool) -> f64 {
    let ct = OLIGO_NM * 1e-9;
    let (ds, ct) = if self_complementary {
        (ds - 1.4, ct)
    } else {
        (ds, ct / 4.0)
    };
    dh * 1000.0 / (ds + R * ct.ln()) - KELVIN
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Melting temperature of a primer against its perfect complement (degC).
pub fn melting_temp(seq: &str) -> f64 {
    if seq.len() < 2 {
        return 0.0;
    }
    let (dh, ds) = duplex(seq.as_bytes());
    round2(bimolecular_tm(dh, ds, is_self_complementary(seq)))
}

/// Maximal runs shared by `a` and `b`, as (start_a, start_b, len).
fn shared_runs(a: &[u8], b: &[u8]) -> Vec<(usize, usize, usize)> {
    let mut runs = Vec::new();
    let mut prev = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        let mut cur = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] && matches!(a[i], b'A' | b'C' | b'G' | b'T') {
                cur[j + 1] = prev[j] + 1;
            }
        }
        for j in 0..b.len() {
            let len = cur[j + 1];
            let extends = i + 1 < a.len() && j + 1 < b.len() && a[i + 1] == b[j + 1];
            if len >= MIN_STEM && !extends {
                runs.push((i + 1 - len, j + 1 - len, len));
            }
        }
        prev = cur;
    }
    runs
}

/// Tm of the most stable duplex formed between two primers (degC).
///
/// Pass the same sequence twice for a homodimer.
pub fn dimer_tm(a: &str, b: &str) -> f64 {
    let target = reverse_complement(b);
    let a = a.as_bytes();
    let best = shared_runs(a, target.as_bytes())
        .into_iter()
        .map(|(start, _, len)| {
            let stem = &a[start..start + len];
            let (dh, ds) = duplex(stem);
            bimolecular_tm(dh, ds, false)
        })
        .fold(0.0_f64, f64::max);
    round2(best)
}

/// Tm of the most stable single-stem hairpin (degC).
pub fn hairpin_tm(seq: &str) -> f64 {
    let n = seq.len();
    let bytes = seq.as_bytes();
    let target = reverse_complement(seq);

    let mut best = 0.0_f64;
    for (i, p, len) in shared_runs(bytes, target.as_bytes()) {
        // arm one is bytes[i..i+k], arm two ends at n-1-p; the loop sits between
        let span = match n.checked_sub(p + i + MIN_LOOP) {
            Some(span) => span,
            None => continue,
        };
        let k = len.min(span / 2);
        if k < MIN_STEM {
            continue;
        }
        let loop_len = n - p - i - 2 * k;

        let (dh, ds) = duplex(&bytes[i..i + k]);
        let loop_dg = 3.5 + 2.44 * R * T37 * (loop_len as f64 / MIN_LOOP as f64).ln() / 1000.0;
        let loop_ds = -loop_dg * 1000.0 / T37;
        let tm = dh * 1000.0 / (ds + loop_ds) - KELVIN;
        best = best.max(tm);
    }
    round2(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_melting_temp_typical_primer() {
        let tm = melting_temp("AGCGTACGTTAGCCATGCAA");
        assert!((55.0..66.0).contains(&tm), "tm = {}", tm);
    }

    #[test]
    fn test_gc_rich_melts_higher() {
        let gc = melting_temp("GCCGGCAGCCGCGGCCGAGC");
        let at = melting_temp("ATTAAAGTTATTAAATTTAC");
        assert!(gc > at + 20.0, "gc = {}, at = {}", gc, at);
    }

    #[test]
    fn test_longer_primer_melts_higher() {
        assert!(melting_temp("AGCGTACGTTAGCCATGCAAGC") > melting_temp("AGCGTACGTTAGCCATGC"));
        assert_eq!(melting_temp("A"), 0.0);
    }

    #[test]
    fn test_hairpin() {
        assert_eq!(hairpin_tm("AAAAAAAAAAAAAAAAAAAA"), 0.0);
        assert!(hairpin_tm("CCGGCGCGAAAACGCGCCGG") > 40.0);
    }

    #[test]
    fn test_dimer() {
        let fwd = "AGCGTACGTTAGCCATGCAA";
        let rev = reverse_complement(fwd);
        assert!(dimer_tm(fwd, &rev) > 40.0);
        assert_eq!(dimer_tm("AAAAAAAAAAAAAAAAAAAA", "CCCCCCCCCCCCCCCCCCCC"), 0.0);
    }

    #[test]
    fn test_shared_runs_reports_maximal_only() {
        let runs = shared_runs(b"TTGAATTCTT", b"CCGAATTCCC");
        assert_eq!(runs, vec![(2, 2, 6)]);
    }
}
