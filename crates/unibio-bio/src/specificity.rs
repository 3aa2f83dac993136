//! Primer binding-site counting on a circular template

use serde::Serialize;

use crate::sequence::reverse_complement;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Specificity {
    pub is_specific: bool,
    pub count: usize,
    pub warning: Option<String>,
}

/// Count exact binding sites of `primer` on both strands of a circular
/// `template`. Both inputs must be normalized.
///
/// The search space is extended by `primer.len() - 1` bases from the
/// template start, so sites spanning the origin are found once and sites at
/// the origin are not counted twice. Matches do not overlap.
pub fn check_specificity(primer: &str, template: &str) -> Specificity {
    let wrap = primer.len().saturating_sub(1).min(template.len());
    let search_space = format!("{}{}", template, &template[..wrap]);

    let forward = count(&search_space, primer);
    let reverse = count(&search_space, &reverse_complement(primer));
    let total = forward + reverse;

    Specificity {
        is_specific: total == 1,
        count: total,
        warning: (total != 1).then(|| format!("Primer binds {} times", total)),
    }
}

fn count(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "GGATCCAAGCTTGCATGCCTGCAGGTCGACTCTAGAGGATCCCCGGGTACCGAGCTCGAATTC";

    #[test]
    fn test_unique_site() {
        let result = check_specificity("AAGCTTGCATGCCTGCAG", TEMPLATE);
        assert!(result.is_specific);
        assert_eq!(result.count, 1);
        assert!(result.warning.is_none());
    }

    #[test]
    fn test_reverse_strand_site() {
        let primer = reverse_complement("GTCGACTCTAGAGGATCC");
        assert!(check_specificity(&primer, TEMPLATE).is_specific);
    }

    #[test]
    fn test_repeated_site() {
        let result = check_specificity("GGATCC", TEMPLATE);
        // palindrome at two positions, seen on both strands
        assert_eq!(result.count, 4);
        assert_eq!(result.warning.as_deref(), Some("Primer binds 4 times"));
    }

    #[test]
    fn test_origin_spanning_site() {
        // last 6 nt + first 6 nt of the template
        let result = check_specificity("GAATTCGGATCC", TEMPLATE);
        assert_eq!(result.count, 1);
    }

    #[test]
    fn test_absent() {
        let result = check_specificity("TTTTTTTTTTTTTTTTTT", TEMPLATE);
        assert_eq!(result.count, 0);
        assert!(!result.is_specific);
    }
}
