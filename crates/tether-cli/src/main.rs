use clap::{Arg, Command, ValueHint};
use tether_cli::input::Input;
use tether_cli::runner::Runner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("TETHER_LOG", "error,tether=info"))
        .init();

    let matches = Command::new("tether")
        .version(clap::crate_version!())
        .about("\u{1f517} - Import crosslink proteomics search results from Kojak + TPP")
        .arg(
            Arg::new("parameters")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("pepxml")
                .short('x')
                .long("pepxml")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to the pepXML file produced by the TPP. Overrides the pepXML file \
                     specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("kojak_conf")
                .short('c')
                .long("kojak-conf")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .num_args(1..)
                .help(
                    "Paths to one or more Kojak parameter files. Overrides the paths in the \
                     configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("fasta")
                .short('f')
                .long("fasta")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to FASTA database searched by Kojak. Overrides the FASTA file \
                     specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("decoy_identifiers")
                .short('d')
                .long("decoy")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .num_args(1..)
                .help(
                    "Protein name substrings that mark a hit as a decoy. Overrides the \
                     identifiers in the configuration file and the Kojak conf.",
                ),
        )
        .arg(
            Arg::new("import_filter")
                .short('i')
                .long("import-filter")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Only PSMs with an error <= this value will be imported. A value of 1 or \
                     higher disables the filter.",
                ),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output_directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path where results files will be written. Overrides the directory \
                     specified in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let input = Input::from_arguments(matches)?;
    let runner = input.build().and_then(Runner::new)?;
    runner.run()?;

    Ok(())
}
