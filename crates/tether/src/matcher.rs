//! Matching reported peptides back to the proteins of the FASTA database.
//!
//! Two passes with deliberately different rules. The pruning pass drops
//! reported peptides whose claimed target proteins cannot be confirmed by
//! name-prefix lookup and case-insensitive sequence containment. The
//! annotation pass then walks the database once more and collects, for every
//! surviving peptide sequence, the non-decoy entries containing it, with
//! leucine and isoleucine treated as the same residue. A peptide that still
//! matches nothing at that point is a hard error.

use crate::fasta::{Fasta, Header};
use crate::peptide::{Peptide, ReportedPeptide};
use crate::psm::Psm;
use fnv::{FnvHashMap, FnvHashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Could not match all peptides to a protein in the FASTA file.")]
    UnmatchedPeptides,
}

/// A database entry containing at least one reported peptide, carrying
/// every header annotation the entry had.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedProtein {
    pub annotations: Vec<Header>,
    pub sequence: String,
}

/// Drop reported peptides whose target proteins cannot be confirmed against
/// the database.
///
/// A claimed protein name is confirmed when some database header starts
/// with it and that entry's sequence contains the peptide sequence,
/// compared case-insensitively. Crosslinks need both sides confirmed.
pub fn prune_unmatched(results: &mut FnvHashMap<ReportedPeptide, Vec<Psm>>, fasta: &Fasta) {
    let candidates = results
        .keys()
        .flat_map(|rp| rp.peptides())
        .flat_map(|peptide| peptide.target_proteins.iter())
        .map(String::as_str)
        .collect::<FnvHashSet<_>>();

    // header name -> lowercased sequence, for the headers the results claim
    let mut cache: FnvHashMap<&str, String> = FnvHashMap::default();
    for entry in &fasta.entries {
        for header in &entry.headers {
            if candidates.iter().any(|c| header.name.starts_with(c)) {
                cache.insert(header.name.as_str(), entry.sequence.to_lowercase());
            }
        }
    }

    results.retain(|rp, _| {
        let keep = match rp {
            ReportedPeptide::Crosslink {
                peptide1, peptide2, ..
            } => confirmed(&cache, peptide1) && confirmed(&cache, peptide2),
            _ => confirmed(&cache, rp.peptide1()),
        };
        if !keep {
            log::info!(
                "Removing {} from results, does not match a target protein.",
                rp
            );
        }
        keep
    });
}

fn confirmed(cache: &FnvHashMap<&str, String>, peptide: &Peptide) -> bool {
    let needle = peptide.sequence.to_lowercase();
    peptide.target_proteins.iter().any(|candidate| {
        cache.iter().any(|(name, sequence)| {
            name.starts_with(candidate.as_str()) && sequence.contains(&needle)
        })
    })
}

struct Needle<'a> {
    sequence: &'a str,
    normalized: String,
    found: bool,
}

/// Collect the database entries containing the surviving peptide sequences.
///
/// Entries whose headers all start with a decoy prefix are passed over.
/// Every peptide must land in at least one entry.
pub fn matched_proteins(
    results: &FnvHashMap<ReportedPeptide, Vec<Psm>>,
    fasta: &Fasta,
    decoy_prefixes: &[String],
) -> Result<Vec<MatchedProtein>, MatchError> {
    let mut needles = results
        .keys()
        .flat_map(|rp| rp.peptides())
        .map(|peptide| peptide.sequence.as_str())
        .collect::<FnvHashSet<_>>()
        .into_iter()
        .map(|sequence| Needle {
            sequence,
            normalized: sequence.replace('L', "I"),
            found: false,
        })
        .collect::<Vec<_>>();
    needles.sort_by_key(|needle| needle.sequence);

    let mut proteins: Vec<MatchedProtein> = Vec::new();
    let mut by_sequence: FnvHashMap<&str, usize> = FnvHashMap::default();
    for entry in &fasta.entries {
        let all_decoy = entry
            .headers
            .iter()
            .all(|h| decoy_prefixes.iter().any(|p| h.name.starts_with(p)));
        if all_decoy {
            continue;
        }
        let haystack = entry.sequence.replace('L', "I");
        let mut matched = false;
        for needle in needles.iter_mut() {
            if haystack.contains(&needle.normalized) {
                needle.found = true;
                matched = true;
            }
        }
        if matched {
            // entries sharing a sequence pool their headers under one protein
            let index = *by_sequence.entry(entry.sequence.as_str()).or_insert_with(|| {
                proteins.push(MatchedProtein {
                    annotations: Vec::new(),
                    sequence: entry.sequence.clone(),
                });
                proteins.len() - 1
            });
            for header in &entry.headers {
                if !proteins[index].annotations.contains(header) {
                    proteins[index].annotations.push(header.clone());
                }
            }
        }
    }

    let mut unmatched = false;
    for needle in &needles {
        if !needle.found {
            log::error!("could not match peptide to a protein: {}", needle.sequence);
            unmatched = true;
        }
    }
    if unmatched {
        return Err(MatchError::UnmatchedPeptides);
    }
    Ok(proteins)
}
