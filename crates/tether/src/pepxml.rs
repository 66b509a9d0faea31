//! Reader for Kojak pepXML as post-processed by the Trans-Proteomic Pipeline.
//!
//! The document graph is returned as-is: run summaries holding spectrum
//! queries, queries holding search results, results holding search hits.
//! Turning hits into reported peptides and PSMs happens downstream, in
//! [`crate::extract`].

use crate::peptide::LinkType;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rust_decimal::Decimal;
use std::io::BufRead;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
/// Which tag are we inside?
enum State {
    RunSummary,
    SpectrumQuery,
    SearchResult,
    SearchHit,
    Xlink,
    LinkedPeptide,
}

/// A parsed pepXML document.
#[derive(Clone, Debug, Default)]
pub struct Analysis {
    pub run_summaries: Vec<RunSummary>,
    /// Whether iProphet was run over this document, either declared by an
    /// `analysis_summary` or betrayed by an `interprophet_result` on a hit
    pub has_iprophet: bool,
}

#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Extension of the raw data files, e.g. `.mzXML`
    pub raw_data: String,
    pub spectrum_queries: Vec<SpectrumQuery>,
}

#[derive(Clone, Debug, Default)]
pub struct SpectrumQuery {
    /// Reported scan identifier, `file.start_scan.end_scan.charge`
    pub spectrum: String,
    pub start_scan: u32,
    pub assumed_charge: u8,
    pub search_results: Vec<SearchResult>,
}

#[derive(Clone, Debug, Default)]
pub struct SearchResult {
    pub search_hits: Vec<SearchHit>,
}

#[derive(Clone, Debug, Default)]
pub struct SearchHit {
    pub peptide: String,
    pub protein: String,
    pub alternative_proteins: Vec<String>,
    pub link_type: LinkType,
    pub modifications: Vec<ModAminoAcidMass>,
    /// Present for crosslink and looplink hits
    pub xlink: Option<Xlink>,
    /// Whether a `peptideprophet` analysis_result was attached to this hit.
    /// Hits without one never went through PeptideProphet and are skipped
    pub has_peptide_prophet: bool,
    pub kojak_score: Option<Decimal>,
    pub delta_score: Option<Decimal>,
    pub ppm_error: Option<Decimal>,
    pub peptide_prophet: Option<Decimal>,
    pub inter_prophet: Option<Decimal>,
}

#[derive(Clone, Debug, Default)]
pub struct Xlink {
    /// Mass of the crosslinker
    pub mass: Decimal,
    /// The two sides of a crosslink, empty for looplinks
    pub linked_peptides: Vec<LinkedPeptide>,
    /// `xlink_score name="link"` entries attached directly to the xlink,
    /// i.e. the two linked positions of a looplink
    pub link_positions: Vec<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LinkedPeptide {
    pub peptide: String,
    pub protein: String,
    pub alternative_proteins: Vec<String>,
    pub modifications: Vec<ModAminoAcidMass>,
    pub link_positions: Vec<u32>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModAminoAcidMass {
    /// 1-based position in the peptide
    pub position: u32,
    /// Total mass of the residue after modification
    pub mass: Decimal,
    /// Mass delta, present only when the modification is variable
    pub variable: Option<Decimal>,
}

impl Analysis {
    pub fn parse<B: BufRead>(b: B) -> Result<Analysis, PepXmlError> {
        let mut reader = Reader::from_reader(b);
        let mut buf = Vec::new();

        let mut state = None;
        let mut analysis = Analysis::default();
        let mut run = RunSummary::default();
        let mut query = SpectrumQuery::default();
        let mut result = SearchResult::default();
        let mut hit = SearchHit::default();
        let mut xlink: Option<Xlink> = None;
        let mut linked = LinkedPeptide::default();

        macro_rules! extract {
            ($ev:expr, $key:expr) => {
                $ev.try_get_attribute($key)?
                    .ok_or(PepXmlError::Malformed)?
                    .value
            };
        }

        macro_rules! extract_parse {
            ($ev:expr, $key:expr) => {{
                let s = extract!($ev, $key);
                std::str::from_utf8(&s)?.parse()?
            }};
        }

        macro_rules! extract_decimal {
            ($ev:expr, $key:expr) => {{
                let s = extract!($ev, $key);
                parse_decimal(std::str::from_utf8(&s)?)?
            }};
        }

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref ev)) => {
                    // State transition into child tag
                    state = match (ev.name().into_inner(), state) {
                        (b"msms_run_summary", _) => Some(State::RunSummary),
                        (b"spectrum_query", Some(State::RunSummary)) => Some(State::SpectrumQuery),
                        (b"search_result", Some(State::SpectrumQuery)) => Some(State::SearchResult),
                        (b"search_hit", Some(State::SearchResult)) => Some(State::SearchHit),
                        (b"xlink", Some(State::SearchHit)) => Some(State::Xlink),
                        (b"linked_peptide", Some(State::Xlink)) => Some(State::LinkedPeptide),
                        _ => state,
                    };
                    match ev.name().into_inner() {
                        b"msms_run_summary" => {
                            let raw_data = extract!(ev, b"raw_data");
                            run = RunSummary {
                                raw_data: std::str::from_utf8(&raw_data)?.to_string(),
                                ..Default::default()
                            };
                        }
                        b"spectrum_query" => {
                            let spectrum = extract!(ev, b"spectrum");
                            query = SpectrumQuery {
                                spectrum: std::str::from_utf8(&spectrum)?.to_string(),
                                start_scan: extract_parse!(ev, b"start_scan"),
                                assumed_charge: extract_parse!(ev, b"assumed_charge"),
                                ..Default::default()
                            };
                        }
                        b"search_hit" => {
                            let peptide = extract!(ev, b"peptide");
                            let protein = extract!(ev, b"protein");
                            let tag = extract!(ev, b"xlink_type");
                            let tag = std::str::from_utf8(&tag)?;
                            hit = SearchHit {
                                peptide: std::str::from_utf8(&peptide)?.to_string(),
                                protein: std::str::from_utf8(&protein)?.to_string(),
                                link_type: LinkType::from_xlink_type(tag).ok_or_else(|| {
                                    PepXmlError::UnknownLinkType {
                                        tag: tag.into(),
                                        spectrum: query.spectrum.clone(),
                                    }
                                })?,
                                ..Default::default()
                            };
                        }
                        b"xlink" => {
                            xlink = Some(Xlink {
                                mass: extract_decimal!(ev, b"mass"),
                                ..Default::default()
                            });
                        }
                        b"linked_peptide" => {
                            let peptide = extract!(ev, b"peptide");
                            let protein = extract!(ev, b"protein");
                            linked = LinkedPeptide {
                                peptide: std::str::from_utf8(&peptide)?.to_string(),
                                protein: std::str::from_utf8(&protein)?.to_string(),
                                ..Default::default()
                            };
                        }
                        b"analysis_result" => {
                            if let Some(attr) = ev.try_get_attribute(b"analysis")? {
                                if attr.value.as_ref() == b"peptideprophet" {
                                    hit.has_peptide_prophet = true;
                                }
                            }
                        }
                        b"peptideprophet_result" => {
                            hit.peptide_prophet = Some(extract_decimal!(ev, b"probability"));
                        }
                        b"interprophet_result" => {
                            hit.inter_prophet = Some(extract_decimal!(ev, b"probability"));
                            analysis.has_iprophet = true;
                        }
                        b"analysis_summary" => {
                            if let Some(attr) = ev.try_get_attribute(b"analysis")? {
                                if attr.value.as_ref() == b"interprophet" {
                                    analysis.has_iprophet = true;
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Empty(ref ev)) => match (state, ev.name().into_inner()) {
                    (Some(State::SearchHit), b"search_score") => {
                        let name = extract!(ev, b"name");
                        match name.as_ref() {
                            b"kojak_score" => {
                                hit.kojak_score = Some(extract_decimal!(ev, b"value"))
                            }
                            b"delta_score" => {
                                hit.delta_score = Some(extract_decimal!(ev, b"value"))
                            }
                            b"ppm_error" => hit.ppm_error = Some(extract_decimal!(ev, b"value")),
                            _ => {}
                        }
                    }
                    (Some(State::SearchHit), b"alternative_protein") => {
                        let protein = extract!(ev, b"protein");
                        hit.alternative_proteins
                            .push(std::str::from_utf8(&protein)?.to_string());
                    }
                    (Some(State::LinkedPeptide), b"alternative_protein") => {
                        let protein = extract!(ev, b"protein");
                        linked
                            .alternative_proteins
                            .push(std::str::from_utf8(&protein)?.to_string());
                    }
                    (Some(State::SearchHit), b"mod_aminoacid_mass") => {
                        hit.modifications.push(read_mod(ev)?);
                    }
                    (Some(State::LinkedPeptide), b"mod_aminoacid_mass") => {
                        linked.modifications.push(read_mod(ev)?);
                    }
                    (Some(State::Xlink), b"xlink_score") => {
                        let name = extract!(ev, b"name");
                        if name.as_ref() == b"link" {
                            if let Some(xl) = xlink.as_mut() {
                                xl.link_positions.push(extract_parse!(ev, b"value"));
                            }
                        }
                    }
                    (Some(State::LinkedPeptide), b"xlink_score") => {
                        let name = extract!(ev, b"name");
                        if name.as_ref() == b"link" {
                            linked.link_positions.push(extract_parse!(ev, b"value"));
                        }
                    }
                    (Some(State::SearchHit), b"analysis_result") => {
                        if let Some(attr) = ev.try_get_attribute(b"analysis")? {
                            if attr.value.as_ref() == b"peptideprophet" {
                                hit.has_peptide_prophet = true;
                            }
                        }
                    }
                    (Some(State::SearchHit), b"peptideprophet_result") => {
                        hit.peptide_prophet = Some(extract_decimal!(ev, b"probability"));
                    }
                    (Some(State::SearchHit), b"interprophet_result") => {
                        hit.inter_prophet = Some(extract_decimal!(ev, b"probability"));
                        analysis.has_iprophet = true;
                    }
                    (_, b"analysis_summary") => {
                        if let Some(attr) = ev.try_get_attribute(b"analysis")? {
                            if attr.value.as_ref() == b"interprophet" {
                                analysis.has_iprophet = true;
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(ev)) => {
                    state = match (state, ev.name().into_inner()) {
                        (Some(State::LinkedPeptide), b"linked_peptide") => {
                            if let Some(xl) = xlink.as_mut() {
                                xl.linked_peptides.push(std::mem::take(&mut linked));
                            }
                            Some(State::Xlink)
                        }
                        (Some(State::Xlink), b"xlink") => {
                            hit.xlink = xlink.take();
                            Some(State::SearchHit)
                        }
                        (Some(State::SearchHit), b"search_hit") => {
                            result.search_hits.push(std::mem::take(&mut hit));
                            Some(State::SearchResult)
                        }
                        (Some(State::SearchResult), b"search_result") => {
                            query.search_results.push(std::mem::take(&mut result));
                            Some(State::SpectrumQuery)
                        }
                        (Some(State::SpectrumQuery), b"spectrum_query") => {
                            run.spectrum_queries.push(std::mem::take(&mut query));
                            Some(State::RunSummary)
                        }
                        (Some(State::RunSummary), b"msms_run_summary") => {
                            analysis.run_summaries.push(std::mem::take(&mut run));
                            None
                        }
                        _ => state,
                    };
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(err.into()),
            }
            buf.clear();
        }
        Ok(analysis)
    }
}

fn read_mod(ev: &BytesStart) -> Result<ModAminoAcidMass, PepXmlError> {
    let position = ev
        .try_get_attribute(b"position")?
        .ok_or(PepXmlError::Malformed)?
        .value;
    let mass = ev
        .try_get_attribute(b"mass")?
        .ok_or(PepXmlError::Malformed)?
        .value;
    let variable = match ev.try_get_attribute(b"variable")? {
        Some(attr) => Some(parse_decimal(std::str::from_utf8(&attr.value)?)?),
        None => None,
    };
    Ok(ModAminoAcidMass {
        position: std::str::from_utf8(&position)?.parse()?,
        mass: parse_decimal(std::str::from_utf8(&mass)?)?,
        variable,
    })
}

/// Parse a decimal attribute, falling back to scientific notation for
/// values like `9.1e-05`.
fn parse_decimal(s: &str) -> Result<Decimal, rust_decimal::Error> {
    s.parse().or_else(|_| Decimal::from_scientific(s))
}

/// Base name of the raw file a reported scan string refers to: everything
/// before the trailing `start.end.charge` fields.
pub fn scan_file_base(spectrum: &str) -> Result<&str, PepXmlError> {
    let mut it = spectrum.rsplitn(4, '.');
    let trailing_ok = (0..3).all(|_| {
        it.next()
            .map(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false)
    });
    match (trailing_ok, it.next()) {
        (true, Some(base)) if !base.is_empty() => Ok(base),
        _ => Err(PepXmlError::ScanSyntax(spectrum.into())),
    }
}

/// Scan number encoded in a reported scan string, i.e. the second-to-last
/// dot-delimited field.
pub fn scan_number(spectrum: &str) -> Result<u32, PepXmlError> {
    let fields = spectrum.split('.').collect::<Vec<_>>();
    if fields.len() < 4 {
        return Err(PepXmlError::ScanSyntax(spectrum.into()));
    }
    Ok(fields[fields.len() - 2].parse()?)
}

/// Charge state encoded in a reported scan string, i.e. the last
/// dot-delimited field.
pub fn scan_charge(spectrum: &str) -> Result<u8, PepXmlError> {
    let fields = spectrum.split('.').collect::<Vec<_>>();
    if fields.len() < 4 {
        return Err(PepXmlError::ScanSyntax(spectrum.into()));
    }
    Ok(fields[fields.len() - 1].parse()?)
}

#[derive(thiserror::Error, Debug)]
pub enum PepXmlError {
    #[error("malformed pepXML")]
    Malformed,
    #[error("unknown xlink_type \"{tag}\" for result: {spectrum}")]
    UnknownLinkType { tag: String, spectrum: String },
    #[error("Got unexpected syntax for reported scan string: {0}")]
    ScanSyntax(String),
    #[error("XML parsing error: {0}")]
    XMLError(#[from] quick_xml::Error),
    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("utf8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
    #[error("error parsing int: {0}")]
    IntError(#[from] std::num::ParseIntError),
    #[error("error parsing decimal: {0}")]
    DecimalError(#[from] rust_decimal::Error),
}
