pub mod config;
pub mod decoy;
pub mod extract;
pub mod fasta;
pub mod fdr;
pub mod matcher;
pub mod peptide;
pub mod pepxml;
pub mod psm;

use std::path::Path;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    PepXML(pepxml::PepXmlError),
    KojakConf(config::KojakConfError),
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IO(e) => e.fmt(f),
            Self::PepXML(e) => e.fmt(f),
            Self::KojakConf(e) => e.fmt(f),
            Self::Json(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

pub fn read_pepxml<S: AsRef<Path>>(path: S) -> Result<pepxml::Analysis, Error> {
    let file = std::fs::File::open(path).map_err(Error::IO)?;
    pepxml::Analysis::parse(std::io::BufReader::new(file)).map_err(Error::PepXML)
}

pub fn read_fasta<S: AsRef<Path>>(path: S) -> Result<fasta::Fasta, Error> {
    let contents = std::fs::read_to_string(path).map_err(Error::IO)?;
    Ok(fasta::Fasta::parse(&contents))
}

pub fn read_kojak_conf<S: AsRef<Path>>(path: S) -> Result<config::KojakConf, Error> {
    let contents = std::fs::read_to_string(path).map_err(Error::IO)?;
    config::KojakConf::parse(&contents).map_err(Error::KojakConf)
}

pub fn read_json<S, T>(path: S) -> Result<T, Error>
where
    S: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = std::fs::read_to_string(path).map_err(Error::IO)?;
    serde_json::from_str(&contents).map_err(Error::Json)
}
