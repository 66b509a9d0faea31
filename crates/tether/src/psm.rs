use rust_decimal::Decimal;

/// One peptide-spectrum match, attached to a [`crate::peptide::ReportedPeptide`]
/// key in the results map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Psm {
    /// Name of the raw file the spectrum came from, reconstructed from the
    /// reported spectrum identifier and the run's raw data extension
    pub scan_file: String,
    /// Scan number within the raw file
    pub scan_number: u32,
    /// Assumed precursor charge state
    pub charge: u8,
    /// Crosslinker mass for crosslinks and looplinks, `None` for unlinked
    pub linker_mass: Option<Decimal>,
    /// Kojak's primary score for this hit
    pub kojak_score: Decimal,
    /// Score distance to the next-best hit
    pub delta_score: Decimal,
    /// Precursor mass error in parts per million
    pub ppm_error: Decimal,
    /// PeptideProphet probability of being a correct identification
    pub peptide_prophet: Decimal,
    /// iProphet probability, when the pipeline ran iProphet
    pub inter_prophet: Option<Decimal>,
}
