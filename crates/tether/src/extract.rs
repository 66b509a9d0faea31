//! Fold a parsed pepXML document into the canonical results map, keyed by
//! reported peptide with the list of PSMs observed for it.
//!
//! A search hit contributes a PSM when it went through PeptideProphet and is
//! not a decoy. Kojak reports near-isobaric leucine/isoleucine variants of
//! the same match as sibling hits under one search result; each variant's
//! reported peptide receives the PSM.

use crate::decoy::{is_decoy_hit, target_protein_names};
use crate::peptide::{LinkType, Peptide, ReportedPeptide};
use crate::pepxml::{
    self, Analysis, LinkedPeptide, ModAminoAcidMass, RunSummary, SearchHit, SpectrumQuery,
};
use crate::psm::Psm;
use fnv::{FnvHashMap, FnvHashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Missing delta score for result: {0}")]
    MissingDeltaScore(String),
    #[error("Missing PPM error for result: {0}")]
    MissingPpmError(String),
    #[error("Missing kojak score for result: {0}")]
    MissingKojakScore(String),
    #[error("Missing iprophet score for result: {0}")]
    MissingInterProphetScore(String),
    #[error("Missing peptideprophet score for result: {0}")]
    MissingPeptideProphetScore(String),
    #[error("Missing xlink element for result: {0}")]
    MissingXlink(String),
    #[error("Got more than two linked peptides for result: {0}")]
    TooManyLinkedPeptides(String),
    #[error("Did not get two linked peptides for result: {0}")]
    TooFewLinkedPeptides(String),
    #[error("Got more than one linked position in peptide for result: {0}")]
    TooManyLinkedPositions(String),
    #[error("Could not find linked position in peptide for result: {0}")]
    MissingLinkedPosition(String),
    #[error("Got more than 2 linked positions for looplink result: {0}")]
    TooManyLooplinkPositions(String),
    #[error("Did not get two positions for looplink result: {0}")]
    TooFewLooplinkPositions(String),
    #[error(transparent)]
    PepXml(#[from] pepxml::PepXmlError),
}

pub fn reported_peptides(
    analysis: &Analysis,
    decoys: &[String],
    filter_15n: Option<&str>,
) -> Result<FnvHashMap<ReportedPeptide, Vec<Psm>>, ExtractError> {
    let mut results: FnvHashMap<ReportedPeptide, Vec<Psm>> = FnvHashMap::default();
    for run in &analysis.run_summaries {
        for query in &run.spectrum_queries {
            for result in &query.search_results {
                for (idx, hit) in result.search_hits.iter().enumerate() {
                    if !hit.has_peptide_prophet {
                        continue;
                    }
                    if is_decoy_hit(hit, decoys) {
                        continue;
                    }
                    let psm = build_psm(run, query, analysis.has_iprophet, hit)?;
                    let rp = reported_peptide(hit, &query.spectrum, decoys, filter_15n)?;

                    let mut alternates: FnvHashSet<ReportedPeptide> = FnvHashSet::default();
                    for (other_idx, other) in result.search_hits.iter().enumerate() {
                        if other_idx == idx {
                            continue;
                        }
                        let other_rp = reported_peptide(other, &query.spectrum, decoys, filter_15n)?;
                        if other_rp.link_type() != rp.link_type() || other_rp == rp {
                            continue;
                        }
                        if rp.il_collapsed() == other_rp.il_collapsed() {
                            alternates.insert(other_rp);
                        } else if let Some(swapped) = other_rp.swapped() {
                            // crosslink sides can canonicalize in opposite
                            // orders once I and L are collapsed
                            if rp.il_collapsed() == swapped.il_collapsed() {
                                alternates.insert(other_rp);
                            }
                        }
                    }
                    for alternate in alternates {
                        results.entry(alternate).or_default().push(psm.clone());
                    }

                    results.entry(rp).or_default().push(psm);
                }
            }
        }
    }
    Ok(results)
}

fn build_psm(
    run: &RunSummary,
    query: &SpectrumQuery,
    has_iprophet: bool,
    hit: &SearchHit,
) -> Result<Psm, ExtractError> {
    let spectrum = &query.spectrum;
    let scan_file = format!("{}{}", pepxml::scan_file_base(spectrum)?, run.raw_data);

    let linker_mass = match hit.link_type {
        LinkType::Unlinked => None,
        LinkType::Looplink | LinkType::Crosslink => Some(
            hit.xlink
                .as_ref()
                .ok_or_else(|| ExtractError::MissingXlink(spectrum.clone()))?
                .mass,
        ),
    };

    let delta_score = hit
        .delta_score
        .ok_or_else(|| ExtractError::MissingDeltaScore(spectrum.clone()))?;
    let ppm_error = hit
        .ppm_error
        .ok_or_else(|| ExtractError::MissingPpmError(spectrum.clone()))?;
    let kojak_score = hit
        .kojak_score
        .ok_or_else(|| ExtractError::MissingKojakScore(spectrum.clone()))?;
    let inter_prophet = match (has_iprophet, hit.inter_prophet) {
        (true, None) => return Err(ExtractError::MissingInterProphetScore(spectrum.clone())),
        (_, inter_prophet) => inter_prophet,
    };
    let peptide_prophet = hit
        .peptide_prophet
        .ok_or_else(|| ExtractError::MissingPeptideProphetScore(spectrum.clone()))?;

    Ok(Psm {
        scan_file,
        scan_number: query.start_scan,
        charge: query.assumed_charge,
        linker_mass,
        kojak_score,
        delta_score,
        ppm_error,
        peptide_prophet,
        inter_prophet,
    })
}

/// Build the canonical reported peptide for a search hit. Malformed link
/// records are fatal and name the offending spectrum.
pub fn reported_peptide(
    hit: &SearchHit,
    spectrum: &str,
    decoys: &[String],
    filter_15n: Option<&str>,
) -> Result<ReportedPeptide, ExtractError> {
    match hit.link_type {
        LinkType::Unlinked => Ok(ReportedPeptide::unlinked(hit_peptide(hit, decoys, filter_15n))),
        LinkType::Looplink => {
            let xlink = hit
                .xlink
                .as_ref()
                .ok_or_else(|| ExtractError::MissingXlink(spectrum.into()))?;
            match *xlink.link_positions.as_slice() {
                [a, b] => Ok(ReportedPeptide::looplink(
                    hit_peptide(hit, decoys, filter_15n),
                    a,
                    b,
                )),
                [] | [_] => Err(ExtractError::TooFewLooplinkPositions(spectrum.into())),
                _ => Err(ExtractError::TooManyLooplinkPositions(spectrum.into())),
            }
        }
        LinkType::Crosslink => {
            let xlink = hit
                .xlink
                .as_ref()
                .ok_or_else(|| ExtractError::MissingXlink(spectrum.into()))?;
            match xlink.linked_peptides.as_slice() {
                [a, b] => {
                    let (peptide_a, position_a) = linked_peptide(a, spectrum, decoys, filter_15n)?;
                    let (peptide_b, position_b) = linked_peptide(b, spectrum, decoys, filter_15n)?;
                    Ok(ReportedPeptide::crosslink(
                        peptide_a, position_a, peptide_b, position_b,
                    ))
                }
                [] | [_] => Err(ExtractError::TooFewLinkedPeptides(spectrum.into())),
                _ => Err(ExtractError::TooManyLinkedPeptides(spectrum.into())),
            }
        }
    }
}

fn linked_peptide(
    lp: &LinkedPeptide,
    spectrum: &str,
    decoys: &[String],
    filter_15n: Option<&str>,
) -> Result<(Peptide, u32), ExtractError> {
    let position = match *lp.link_positions.as_slice() {
        [position] => position,
        [] => return Err(ExtractError::MissingLinkedPosition(spectrum.into())),
        _ => return Err(ExtractError::TooManyLinkedPositions(spectrum.into())),
    };
    Ok((
        to_peptide(
            &lp.peptide,
            &lp.protein,
            &lp.alternative_proteins,
            &lp.modifications,
            decoys,
            filter_15n,
        ),
        position,
    ))
}

fn hit_peptide(hit: &SearchHit, decoys: &[String], filter_15n: Option<&str>) -> Peptide {
    to_peptide(
        &hit.peptide,
        &hit.protein,
        &hit.alternative_proteins,
        &hit.modifications,
        decoys,
        filter_15n,
    )
}

fn to_peptide(
    sequence: &str,
    primary: &str,
    alternates: &[String],
    modifications: &[ModAminoAcidMass],
    decoys: &[String],
    filter_15n: Option<&str>,
) -> Peptide {
    let mut peptide = Peptide::new(sequence);
    for m in modifications {
        // static modifications carry no `variable` attribute and are not
        // part of the reported peptide identity
        if let Some(mass) = m.variable {
            peptide.add_modification(m.position, mass);
        }
    }
    if let Some(prefix) = filter_15n {
        if primary.starts_with(prefix) {
            peptide.isotope_label = Some(prefix.to_string());
        }
    }
    peptide.target_proteins = target_protein_names(decoys, primary, alternates);
    peptide
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pepxml::{SearchResult, Xlink};
    use rust_decimal_macros::dec;

    fn unlinked_hit(peptide: &str, protein: &str) -> SearchHit {
        SearchHit {
            peptide: peptide.into(),
            protein: protein.into(),
            link_type: LinkType::Unlinked,
            has_peptide_prophet: true,
            kojak_score: Some(dec!(2.4410)),
            delta_score: Some(dec!(1.0020)),
            ppm_error: Some(dec!(0.5000)),
            peptide_prophet: Some(dec!(0.9900)),
            ..Default::default()
        }
    }

    fn crosslink_hit(a: (&str, &str, u32), b: (&str, &str, u32)) -> SearchHit {
        let lp = |(peptide, protein, position): (&str, &str, u32)| LinkedPeptide {
            peptide: peptide.into(),
            protein: protein.into(),
            link_positions: vec![position],
            ..Default::default()
        };
        SearchHit {
            peptide: "-".into(),
            protein: "-".into(),
            link_type: LinkType::Crosslink,
            xlink: Some(Xlink {
                mass: dec!(138.068074),
                linked_peptides: vec![lp(a), lp(b)],
                ..Default::default()
            }),
            ..unlinked_hit("-", "-")
        }
    }

    fn query(spectrum: &str, scan: u32, charge: u8, hits: Vec<SearchHit>) -> SpectrumQuery {
        SpectrumQuery {
            spectrum: spectrum.into(),
            start_scan: scan,
            assumed_charge: charge,
            search_results: vec![SearchResult { search_hits: hits }],
        }
    }

    fn analysis(queries: Vec<SpectrumQuery>) -> Analysis {
        Analysis {
            run_summaries: vec![RunSummary {
                raw_data: ".mzXML".into(),
                spectrum_queries: queries,
            }],
            has_iprophet: false,
        }
    }

    #[test]
    fn aggregates_psms_under_one_reported_peptide() {
        let analysis = analysis(vec![
            query("run1.00100.00100.2", 100, 2, vec![unlinked_hit("PEPTIDEK", "sp|P1")]),
            query("run1.00200.00200.3", 200, 3, vec![unlinked_hit("PEPTIDEK", "sp|P1")]),
        ]);
        let results = reported_peptides(&analysis, &[], None).unwrap();
        assert_eq!(results.len(), 1);
        let (rp, psms) = results.iter().next().unwrap();
        assert_eq!(rp.to_string(), "PEPTIDEK");
        assert_eq!(psms.len(), 2);
        assert_eq!(psms[0].scan_file, "run1.mzXML");
        assert_eq!(psms[0].scan_number, 100);
        assert_eq!(psms[0].charge, 2);
        assert_eq!(psms[0].linker_mass, None);
    }

    #[test]
    fn hits_without_peptide_prophet_are_skipped() {
        let mut hit = unlinked_hit("PEPTIDEK", "sp|P1");
        hit.has_peptide_prophet = false;
        hit.peptide_prophet = None;
        let analysis = analysis(vec![query("run1.00100.00100.2", 100, 2, vec![hit])]);
        let results = reported_peptides(&analysis, &[], None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn decoy_hits_are_dropped() {
        let decoys = vec!["random".to_string()];
        let analysis = analysis(vec![
            query("run1.00100.00100.2", 100, 2, vec![unlinked_hit("AAAK", "random_sp|P1")]),
            query("run1.00200.00200.2", 200, 2, vec![unlinked_hit("CCCK", "sp|P2")]),
        ]);
        let results = reported_peptides(&analysis, &decoys, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.keys().next().unwrap().to_string(), "CCCK");
    }

    #[test]
    fn crosslink_reported_peptide_is_canonical() {
        let hit = crosslink_hit(("EFGKSR", "sp|P3", 4), ("ACDKLR", "sp|P1", 4));
        let analysis = analysis(vec![query("run1.00100.00100.4", 100, 4, vec![hit])]);
        let results = reported_peptides(&analysis, &[], None).unwrap();
        let (rp, psms) = results.iter().next().unwrap();
        assert_eq!(rp.to_string(), "ACDKLR(4)-EFGKSR(4)");
        assert_eq!(psms[0].linker_mass, Some(dec!(138.068074)));
    }

    #[test]
    fn crosslink_with_one_decoy_side_is_dropped() {
        let decoys = vec!["random".to_string()];
        let hit = crosslink_hit(("EFGKSR", "random_sp|P3", 4), ("ACDKLR", "sp|P1", 4));
        let analysis = analysis(vec![query("run1.00100.00100.4", 100, 4, vec![hit])]);
        let results = reported_peptides(&analysis, &decoys, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn looplink_position_count_is_checked() {
        let mut hit = unlinked_hit("MKVNKELK", "sp|P1");
        hit.link_type = LinkType::Looplink;
        hit.xlink = Some(Xlink {
            mass: dec!(138.068074),
            link_positions: vec![2],
            ..Default::default()
        });
        let analysis = analysis(vec![query("run1.00100.00100.3", 100, 3, vec![hit])]);
        let err = reported_peptides(&analysis, &[], None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Did not get two positions for looplink result: run1.00100.00100.3"
        );
    }

    #[test]
    fn missing_delta_score_is_fatal() {
        let mut hit = unlinked_hit("PEPTIDEK", "sp|P1");
        hit.delta_score = None;
        let analysis = analysis(vec![query("run1.00100.00100.2", 100, 2, vec![hit])]);
        let err = reported_peptides(&analysis, &[], None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing delta score for result: run1.00100.00100.2"
        );
    }

    #[test]
    fn iprophet_score_required_when_document_has_iprophet() {
        let mut a = analysis(vec![query(
            "run1.00100.00100.2",
            100,
            2,
            vec![unlinked_hit("PEPTIDEK", "sp|P1")],
        )]);
        a.has_iprophet = true;
        let err = reported_peptides(&a, &[], None).unwrap_err();
        assert!(matches!(err, ExtractError::MissingInterProphetScore(_)));
    }

    #[test]
    fn leucine_isoleucine_variants_share_psms() {
        let hits = vec![
            unlinked_hit("PEPTIDEK", "sp|P1"),
            unlinked_hit("PEPTLDEK", "sp|P2"),
        ];
        let analysis = analysis(vec![query("run1.00100.00100.2", 100, 2, hits)]);
        let results = reported_peptides(&analysis, &[], None).unwrap();
        assert_eq!(results.len(), 2);
        for psms in results.values() {
            assert_eq!(psms.len(), 2);
        }
    }

    #[test]
    fn variants_of_different_link_type_do_not_merge() {
        let mut looplink = unlinked_hit("PEPTIDEK", "sp|P1");
        looplink.link_type = LinkType::Looplink;
        looplink.xlink = Some(Xlink {
            mass: dec!(138.068074),
            link_positions: vec![1, 8],
            ..Default::default()
        });
        let hits = vec![unlinked_hit("PEPTLDEK", "sp|P1"), looplink];
        let analysis = analysis(vec![query("run1.00100.00100.2", 100, 2, hits)]);
        let results = reported_peptides(&analysis, &[], None).unwrap();
        assert_eq!(results.len(), 2);
        for psms in results.values() {
            assert_eq!(psms.len(), 1);
        }
    }

    #[test]
    fn crosslink_variants_merge_after_swapping_sides() {
        // once I and L collapse these are the same link, but their canonical
        // orderings put the sides in opposite order
        let hits = vec![
            crosslink_hit(("IIIK", "sp|P1", 4), ("KKKR", "sp|P2", 1)),
            crosslink_hit(("LLLK", "sp|P3", 4), ("KKKR", "sp|P2", 1)),
        ];
        let analysis = analysis(vec![query("run1.00100.00100.4", 100, 4, hits)]);
        let results = reported_peptides(&analysis, &[], None).unwrap();
        assert_eq!(results.len(), 2);
        for psms in results.values() {
            assert_eq!(psms.len(), 2);
        }
    }

    #[test]
    fn isotope_label_from_primary_protein() {
        let analysis = analysis(vec![query(
            "run1.00100.00100.2",
            100,
            2,
            vec![unlinked_hit("PEPTIDEK", "15N_sp|P1")],
        )]);
        let results = reported_peptides(&analysis, &[], Some("15N")).unwrap();
        assert_eq!(results.keys().next().unwrap().to_string(), "PEPTIDEK-15N");
    }

    #[test]
    fn static_modifications_are_not_rendered() {
        let mut hit = unlinked_hit("GCMGK", "sp|P1");
        hit.modifications = vec![
            ModAminoAcidMass {
                position: 2,
                mass: dec!(160.030649),
                variable: None,
            },
            ModAminoAcidMass {
                position: 3,
                mass: dec!(147.0354),
                variable: Some(dec!(15.9949)),
            },
        ];
        let analysis = analysis(vec![query("run1.00100.00100.2", 100, 2, vec![hit])]);
        let results = reported_peptides(&analysis, &[], None).unwrap();
        assert_eq!(results.keys().next().unwrap().to_string(), "GCM[15.99]GK");
    }

    #[test]
    fn target_proteins_collected_per_peptide() {
        let decoys = vec!["random".to_string()];
        let mut hit = unlinked_hit("PEPTIDEK", "sp|P1");
        hit.alternative_proteins = vec!["random_sp|P9".into(), "sp|P2".into()];
        let analysis = analysis(vec![query("run1.00100.00100.2", 100, 2, vec![hit])]);
        let results = reported_peptides(&analysis, &decoys, None).unwrap();
        let rp = results.keys().next().unwrap();
        let proteins = &rp.peptide1().target_proteins;
        assert_eq!(proteins.len(), 2);
        assert!(proteins.contains("sp|P1"));
        assert!(proteins.contains("sp|P2"));
    }
}
