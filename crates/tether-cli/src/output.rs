use fnv::FnvHashMap;
use rust_decimal::Decimal;
use tether_core::fdr::ErrorAnalysis;
use tether_core::matcher::MatchedProtein;
use tether_core::peptide::ReportedPeptide;
use tether_core::psm::Psm;

use crate::Runner;

impl Runner {
    pub fn serialize_psm(
        &self,
        peptide: &ReportedPeptide,
        psm: &Psm,
        peptide_prophet_error: Decimal,
        inter_prophet: Option<(Decimal, Decimal)>,
    ) -> csv::ByteRecord {
        let mut record = csv::ByteRecord::new();
        record.push_field(peptide.to_string().as_bytes());
        record.push_field(peptide.link_type().as_str().as_bytes());
        record.push_field(psm.scan_file.as_bytes());
        record.push_field(itoa::Buffer::new().format(psm.scan_number).as_bytes());
        record.push_field(itoa::Buffer::new().format(psm.charge).as_bytes());
        match psm.linker_mass {
            Some(mass) => record.push_field(mass.to_string().as_bytes()),
            None => record.push_field(b""),
        }
        record.push_field(psm.kojak_score.to_string().as_bytes());
        record.push_field(psm.delta_score.to_string().as_bytes());
        record.push_field(psm.ppm_error.to_string().as_bytes());
        record.push_field(psm.peptide_prophet.to_string().as_bytes());
        record.push_field(error_field(peptide_prophet_error).as_bytes());
        match inter_prophet {
            Some((probability, error)) => {
                record.push_field(probability.to_string().as_bytes());
                record.push_field(error_field(error).as_bytes());
            }
            None => {
                record.push_field(b"");
                record.push_field(b"");
            }
        }
        record
    }

    pub fn write_peptides(
        &self,
        results: &FnvHashMap<ReportedPeptide, Vec<Psm>>,
        peptide_prophet: &ErrorAnalysis,
        inter_prophet: Option<&ErrorAnalysis>,
    ) -> anyhow::Result<String> {
        let path = self.make_path("peptides.tsv");

        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![]);

        let headers = csv::ByteRecord::from(vec![
            "reported_peptide",
            "link_type",
            "scan_file",
            "scan_number",
            "charge",
            "linker_mass",
            "kojak_score",
            "delta_score",
            "ppm_error",
            "peptide_prophet",
            "peptide_prophet_error",
            "inter_prophet",
            "inter_prophet_error",
        ]);
        wtr.write_byte_record(&headers)?;

        let mut entries = results.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (peptide, psms) in entries {
            let mut psms = psms.iter().collect::<Vec<_>>();
            psms.sort_by(|a, b| {
                a.scan_file
                    .cmp(&b.scan_file)
                    .then(a.scan_number.cmp(&b.scan_number))
            });
            for psm in psms {
                let peptide_prophet_error = peptide_prophet.error(psm.peptide_prophet)?;
                let inter = match (inter_prophet, psm.inter_prophet) {
                    (Some(analysis), Some(probability)) => {
                        Some((probability, analysis.error(probability)?))
                    }
                    _ => None,
                };
                let error = inter
                    .map(|(_, error)| error)
                    .unwrap_or(peptide_prophet_error);
                if self.parameters.import_filter < Decimal::ONE
                    && error > self.parameters.import_filter
                {
                    continue;
                }
                wtr.write_byte_record(&self.serialize_psm(
                    peptide,
                    psm,
                    peptide_prophet_error,
                    inter,
                ))?;
            }
        }

        wtr.flush()?;
        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }

    pub fn write_proteins(&self, proteins: &[MatchedProtein]) -> anyhow::Result<String> {
        let path = self.make_path("proteins.tsv");

        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![]);
        let headers = csv::ByteRecord::from(vec!["name", "description", "sequence"]);
        wtr.write_byte_record(&headers)?;

        let mut rows = proteins
            .iter()
            .flat_map(|protein| {
                protein
                    .annotations
                    .iter()
                    .map(move |header| (header, protein.sequence.as_str()))
            })
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| a.0.name.cmp(&b.0.name));

        for (header, sequence) in rows {
            let mut record = csv::ByteRecord::new();
            record.push_field(header.name.as_bytes());
            record.push_field(header.description.as_deref().unwrap_or_default().as_bytes());
            record.push_field(sequence.as_bytes());
            wtr.write_byte_record(&record)?;
        }

        wtr.flush()?;
        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }
}

/// Estimated errors carry four decimal places in the output tables.
fn error_field(mut error: Decimal) -> String {
    error.rescale(4);
    error.to_string()
}
