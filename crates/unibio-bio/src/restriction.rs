//! Restriction site mapping against a table of common commercial enzymes
//!
//! Cut positions are reported 1-based as the first top-strand nucleotide
//! after the cut, on a linear molecule; cuts that would fall outside the
//! sequence are dropped.

use serde::Serialize;

use crate::sequence::{iupac_matches, reverse_complement};

/// Recognition site plus cut offsets, both measured from the first base of
/// a forward-strand site. Offsets may lie outside the site (Type IIS).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enzyme {
    pub name: &'static str,
    pub site: &'static str,
    pub top_cut: isize,
    pub bottom_cut: isize,
}

const fn enzyme(name: &'static str, site: &'static str, top_cut: isize, bottom_cut: isize) -> Enzyme {
    Enzyme {
        name,
        site,
        top_cut,
        bottom_cut,
    }
}

pub const COMMERCIAL_ENZYMES: &[Enzyme] = &[
    enzyme("AatII", "GACGTC", 5, 1),
    enzyme("AccI", "GTMKAC", 2, 4),
    enzyme("AflII", "CTTAAG", 1, 5),
    enzyme("AgeI", "ACCGGT", 1, 5),
    enzyme("AluI", "AGCT", 2, 2),
    enzyme("ApaI", "GGGCCC", 5, 1),
    enzyme("ApaLI", "GTGCAC", 1, 5),
    enzyme("AscI", "GGCGCGCC", 2, 6),
    enzyme("AvrII", "CCTAGG", 1, 5),
    enzyme("BamHI", "GGATCC", 1, 5),
    enzyme("BglII", "AGATCT", 1, 5),
    enzyme("BsaI", "GGTCTC", 7, 11),
    enzyme("BsiWI", "CGTACG", 1, 5),
    enzyme("BsmBI", "CGTCTC", 7, 11),
    enzyme("BspHI", "TCATGA", 1, 5),
    enzyme("BsrGI", "TGTACA", 1, 5),
    enzyme("Bsu36I", "CCTNAGG", 2, 5),
    enzyme("ClaI", "ATCGAT", 2, 4),
    enzyme("DpnII", "GATC", 0, 4),
    enzyme("DraI", "TTTAAA", 3, 3),
    enzyme("EagI", "CGGCCG", 1, 5),
    enzyme("EcoRI", "GAATTC", 1, 5),
    enzyme("EcoRV", "GATATC", 3, 3),
    enzyme("HaeIII", "GGCC", 2, 2),
    enzyme("HindIII", "AAGCTT", 1, 5),
    enzyme("HinfI", "GANTC", 1, 4),
    enzyme("HpaI", "GTTAAC", 3, 3),
    enzyme("KpnI", "GGTACC", 5, 1),
    enzyme("MfeI", "CAATTG", 1, 5),
    enzyme("MluI", "ACGCGT", 1, 5),
    enzyme("MspI", "CCGG", 1, 3),
    enzyme("NcoI", "CCATGG", 1, 5),
    enzyme("NdeI", "CATATG", 2, 4),
    enzyme("NheI", "GCTAGC", 1, 5),
    enzyme("NotI", "GCGGCCGC", 2, 6),
    enzyme("NsiI", "ATGCAT", 5, 1),
    enzyme("PacI", "TTAATTAA", 5, 3),
    enzyme("PmeI", "GTTTAAAC", 4, 4),
    enzyme("PstI", "CTGCAG", 5, 1),
    enzyme("PvuI", "CGATCG", 4, 2),
    enzyme("PvuII", "CAGCTG", 3, 3),
    enzyme("SacI", "GAGCTC", 5, 1),
    enzyme("SacII", "CCGCGG", 4, 2),
    enzyme("SalI", "GTCGAC", 1, 5),
    enzyme("SapI", "GCTCTTC", 8, 11),
    enzyme("ScaI", "AGTACT", 3, 3),
    enzyme("SmaI", "CCCGGG", 3, 3),
    enzyme("SpeI", "ACTAGT", 1, 5),
    enzyme("SphI", "GCATGC", 5, 1),
    enzyme("SspI", "AATATT", 3, 3),
    enzyme("StuI", "AGGCCT", 3, 3),
    enzyme("TaqI", "TCGA", 1, 3),
    enzyme("XbaI", "TCTAGA", 1, 5),
    enzyme("XhoI", "CTCGAG", 1, 5),
    enzyme("XmaI", "CCCGGG", 1, 5),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestrictionHit {
    pub enzyme_name: String,
    pub cut_count: usize,
    pub cut_positions: Vec<usize>,
}

fn site_starts(seq: &[u8], site: &[u8]) -> Vec<usize> {
    if site.len() > seq.len() {
        return Vec::new();
    }
    (0..=seq.len() - site.len())
        .filter(|&start| {
            site.iter()
                .zip(&seq[start..start + site.len()])
                .all(|(&code, &base)| iupac_matches(code, base))
        })
        .collect()
}

impl Enzyme {
    pub fn is_palindromic(&self) -> bool {
        reverse_complement(self.site) == self.site
    }

    /// Sorted, de-duplicated 1-based cut positions in `seq`.
    pub fn cut_positions(&self, seq: &str) -> Vec<usize> {
        let bytes = seq.as_bytes();
        let len = self.site.len() as isize;
        let n = bytes.len() as isize;

        let mut cuts: Vec<isize> = site_starts(bytes, self.site.as_bytes())
            .into_iter()
            .map(|start| start as isize + self.top_cut)
            .collect();

        if !self.is_palindromic() {
            let reverse_site = reverse_complement(self.site);
            cuts.extend(
                site_starts(bytes, reverse_site.as_bytes())
                    .into_iter()
                    .map(|start| start as isize + len - self.bottom_cut),
            );
        }

        let mut positions: Vec<usize> = cuts
            .into_iter()
            .filter(|&cut| cut > 0 && cut < n)
            .map(|cut| cut as usize + 1)
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

/// Enzymes from `COMMERCIAL_ENZYMES` that cut `seq`, in table order.
pub fn find_restriction_sites(seq: &str) -> Vec<RestrictionHit> {
    COMMERCIAL_ENZYMES
        .iter()
        .filter_map(|enzyme| {
            let positions = enzyme.cut_positions(seq);
            (!positions.is_empty()).then(|| RestrictionHit {
                enzyme_name: enzyme.name.to_string(),
                cut_count: positions.len(),
                cut_positions: positions,
            })
        })
        .collect()
}
