//! Decoy classification of protein names and search hits.
//!
//! A protein name is a decoy when it contains any of the configured decoy
//! identifiers, compared case-insensitively. A peptide only counts as a
//! decoy when every protein it maps to is a decoy, so shared peptides lean
//! towards being targets. A crosslink counts as a decoy when either of its
//! two sides is a decoy.

use crate::peptide::LinkType;
use crate::pepxml::SearchHit;
use fnv::FnvHashSet;

pub fn is_decoy_name(identifiers: &[String], name: &str) -> bool {
    let name = name.to_lowercase();
    identifiers
        .iter()
        .any(|id| name.contains(&id.to_lowercase()))
}

fn all_decoy(identifiers: &[String], primary: &str, alternates: &[String]) -> bool {
    is_decoy_name(identifiers, primary)
        && alternates.iter().all(|alt| is_decoy_name(identifiers, alt))
}

/// Should this hit be dropped from the results as a decoy?
///
/// With no identifiers configured every hit is a target.
pub fn is_decoy_hit(hit: &SearchHit, identifiers: &[String]) -> bool {
    match hit.link_type {
        LinkType::Crosslink => match &hit.xlink {
            Some(xlink) => xlink
                .linked_peptides
                .iter()
                .any(|lp| all_decoy(identifiers, &lp.protein, &lp.alternative_proteins)),
            None => false,
        },
        _ => all_decoy(identifiers, &hit.protein, &hit.alternative_proteins),
    }
}

/// The non-decoy protein names a peptide was matched to.
pub fn target_protein_names(
    identifiers: &[String],
    primary: &str,
    alternates: &[String],
) -> FnvHashSet<String> {
    std::iter::once(primary)
        .chain(alternates.iter().map(|s| s.as_str()))
        .filter(|name| !is_decoy_name(identifiers, name))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pepxml::{LinkedPeptide, Xlink};

    fn decoys() -> Vec<String> {
        vec!["random".into()]
    }

    #[test]
    fn name_matching_is_case_insensitive_substring() {
        assert!(is_decoy_name(&decoys(), "RANDOM_sp|P12345"));
        assert!(is_decoy_name(&decoys(), "sp|P12345_Random"));
        assert!(!is_decoy_name(&decoys(), "sp|P12345"));
        assert!(!is_decoy_name(&[], "random_sp|P12345"));
    }

    #[test]
    fn shared_peptides_lean_target() {
        let hit = SearchHit {
            peptide: "PEPTIDEK".into(),
            protein: "random_sp|P1".into(),
            alternative_proteins: vec!["sp|P2".into()],
            ..Default::default()
        };
        assert!(!is_decoy_hit(&hit, &decoys()));

        let hit = SearchHit {
            peptide: "PEPTIDEK".into(),
            protein: "random_sp|P1".into(),
            alternative_proteins: vec!["random_sp|P2".into()],
            ..Default::default()
        };
        assert!(is_decoy_hit(&hit, &decoys()));
    }

    #[test]
    fn crosslink_is_decoy_when_either_side_is() {
        let target = LinkedPeptide {
            peptide: "ACDKLR".into(),
            protein: "sp|P1".into(),
            ..Default::default()
        };
        let decoy = LinkedPeptide {
            peptide: "EFGKSR".into(),
            protein: "random_sp|P9".into(),
            ..Default::default()
        };
        let hit = SearchHit {
            link_type: LinkType::Crosslink,
            xlink: Some(Xlink {
                linked_peptides: vec![target, decoy],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(is_decoy_hit(&hit, &decoys()));
    }

    #[test]
    fn target_names_exclude_decoys() {
        let names = target_protein_names(
            &decoys(),
            "sp|P1",
            &["random_sp|P2".into(), "sp|P3".into()],
        );
        assert_eq!(names.len(), 2);
        assert!(names.contains("sp|P1"));
        assert!(names.contains("sp|P3"));
    }
}
