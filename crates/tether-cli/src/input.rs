use anyhow::{ensure, Context};
use clap::ArgMatches;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Clone)]
/// Actual conversion parameters - may include overrides or default values not set by user
pub struct Settings {
    pub version: String,
    pub pepxml: String,
    pub fasta: String,
    pub kojak_conf: Vec<String>,
    /// Protein name substrings marking decoys. May be empty, in which case
    /// the runner falls back to the `decoy_filter` of the Kojak conf
    pub decoy_identifiers: Vec<String>,
    /// Only PSMs with an error at or below this value are written. A value
    /// of 1 or higher disables the filter
    pub import_filter: Decimal,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize)]
/// Input conversion parameters deserialized from JSON file
pub struct Input {
    pepxml: Option<String>,
    fasta: Option<String>,
    kojak_conf: Option<Vec<String>>,
    decoy_identifiers: Option<Vec<String>>,
    import_filter: Option<f64>,
    output_directory: Option<String>,
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(pepxml) = matches.get_one::<String>("pepxml") {
            log::trace!("overriding `pepxml` parameter.");
            input.pepxml = Some(pepxml.into());
        }
        if let Some(fasta) = matches.get_one::<String>("fasta") {
            log::trace!("overriding `fasta` parameter.");
            input.fasta = Some(fasta.into());
        }
        if let Some(kojak_conf) = matches.get_many::<String>("kojak_conf") {
            log::trace!("overriding `kojak_conf` parameter.");
            input.kojak_conf = Some(kojak_conf.into_iter().map(|p| p.into()).collect());
        }
        if let Some(decoys) = matches.get_many::<String>("decoy_identifiers") {
            log::trace!("overriding `decoy_identifiers` parameter.");
            input.decoy_identifiers = Some(decoys.into_iter().map(|d| d.into()).collect());
        }
        if let Some(import_filter) = matches.get_one::<String>("import_filter") {
            log::trace!("overriding `import_filter` parameter.");
            input.import_filter = Some(
                import_filter
                    .parse::<f64>()
                    .with_context(|| format!("invalid import filter `{import_filter}`"))?,
            );
        }

        // avoid to later panic if these parameters are not set (but doesn't check if files exist)
        ensure!(
            input.output_directory.is_some(),
            "`output_directory` must be set. For more information try '--help'"
        );
        ensure!(
            input.pepxml.is_some(),
            "`pepxml` must be set. For more information try '--help'"
        );
        ensure!(
            input.fasta.is_some(),
            "`fasta` must be set. For more information try '--help'"
        );
        ensure!(
            input.kojak_conf.as_ref().map(|c| !c.is_empty()).unwrap_or(false),
            "`kojak_conf` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<std::path::Path>>(path: S) -> anyhow::Result<Self> {
        tether_core::read_json(path).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Settings> {
        let import_filter = match self.import_filter {
            Some(value) => Decimal::try_from(value)
                .with_context(|| format!("invalid import filter `{value}`"))?,
            None => Decimal::new(5, 2),
        };
        if import_filter >= Decimal::ONE {
            log::warn!("import filter of {} disables error filtering", import_filter);
        }

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path)?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Settings {
            version: clap::crate_version!().into(),
            pepxml: self.pepxml.expect("'pepxml' must be provided!"),
            fasta: self.fasta.expect("'fasta' must be provided!"),
            kojak_conf: self.kojak_conf.unwrap_or_default(),
            decoy_identifiers: self.decoy_identifiers.unwrap_or_default(),
            import_filter,
            output_paths: Vec::new(),
            output_directory,
        })
    }
}
