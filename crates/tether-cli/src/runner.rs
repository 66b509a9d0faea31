use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;
use tether_core::config::{Crosslinker, KojakConf};
use tether_core::extract;
use tether_core::fdr::ErrorAnalysis;
use tether_core::matcher;

use super::input::Settings;

pub struct Runner {
    pub parameters: Settings,
    start: Instant,
}

#[derive(Serialize)]
/// Written to `tether.json` alongside the result tables
struct Report<'a> {
    settings: &'a Settings,
    crosslinker: Option<&'a Crosslinker>,
    static_modifications: &'a BTreeMap<String, Decimal>,
}

impl Runner {
    pub fn new(parameters: Settings) -> anyhow::Result<Self> {
        Ok(Self {
            parameters,
            start: Instant::now(),
        })
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        // Only the first conf file is read for linker, label, and decoy settings
        let conf = match self.parameters.kojak_conf.first() {
            Some(path) => tether_core::read_kojak_conf(path)
                .with_context(|| format!("Failed to read Kojak conf from `{path}`"))?,
            None => KojakConf::default(),
        };

        let decoys = if !self.parameters.decoy_identifiers.is_empty() {
            self.parameters.decoy_identifiers.clone()
        } else if let Some(filter) = &conf.decoy_filter {
            vec![filter.clone()]
        } else {
            log::warn!("No decoy identifiers given. Assuming all results are targets.");
            Vec::new()
        };

        let analysis = tether_core::read_pepxml(&self.parameters.pepxml)
            .with_context(|| format!("Failed to read pepXML from `{}`", self.parameters.pepxml))?;
        info!(
            "parsed {} spectrum queries in {:#?}",
            analysis
                .run_summaries
                .iter()
                .map(|run| run.spectrum_queries.len())
                .sum::<usize>(),
            self.start.elapsed()
        );

        let mut results =
            extract::reported_peptides(&analysis, &decoys, conf.filter_15n.as_deref())?;
        info!("extracted {} distinct reported peptides", results.len());

        let fasta = tether_core::read_fasta(&self.parameters.fasta)
            .with_context(|| format!("Failed to read FASTA from `{}`", self.parameters.fasta))?;
        matcher::prune_unmatched(&mut results, &fasta);
        let proteins = matcher::matched_proteins(&results, &fasta, &decoys)?;
        info!(
            "matched {} protein entries in {:#?}",
            proteins.len(),
            self.start.elapsed()
        );

        let peptide_prophet =
            ErrorAnalysis::build(results.values().flatten().map(|psm| psm.peptide_prophet));
        let inter_prophet = match analysis.has_iprophet {
            true => Some(ErrorAnalysis::build(
                results.values().flatten().filter_map(|psm| psm.inter_prophet),
            )),
            false => None,
        };

        let path = self.write_peptides(&results, &peptide_prophet, inter_prophet.as_ref())?;
        self.parameters.output_paths.push(path);
        let path = self.write_proteins(&proteins)?;
        self.parameters.output_paths.push(path);

        let path = self.make_path("tether.json");
        self.parameters.output_paths.push(path.display().to_string());
        let report = Report {
            settings: &self.parameters,
            crosslinker: conf.crosslinker.as_ref(),
            static_modifications: &conf.static_modifications,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        std::fs::write(&path, serde_json::to_vec_pretty(&report)?)?;

        info!("finished in {:#?}", self.start.elapsed());
        Ok(())
    }

    // Create a path for `file_name` in the specified output directory
    pub fn make_path<S: AsRef<Path>>(&self, file_name: S) -> PathBuf {
        self.parameters.output_directory.join(file_name)
    }
}
