//! Parser for Kojak parameter files.
//!
//! Kojak configuration is a line-oriented `key = value` format with `#`
//! comments. Only the keys the converter cares about are interpreted; every
//! other line is passed over.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KojakConfError {
    #[error("malformed kojak conf line: {0}")]
    Malformed(String),
    #[error("invalid mass in kojak conf line: {0}")]
    InvalidMass(String),
}

/// One side of a crosslinker, e.g. the `nK` in `cross_link = nK nK 138.07 BS3`:
/// the set of residues it can attach to, plus whether it links protein termini.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct LinkableEnd {
    pub residues: BTreeSet<char>,
    pub links_n_terminus: bool,
    pub links_c_terminus: bool,
}

impl LinkableEnd {
    fn parse(token: &str) -> LinkableEnd {
        let mut end = LinkableEnd::default();
        for ch in token.chars() {
            match ch {
                'n' => end.links_n_terminus = true,
                'c' => end.links_c_terminus = true,
                residue => {
                    end.residues.insert(residue);
                }
            }
        }
        end
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Crosslinker {
    /// Trailing label on the `cross_link` line, when the conf carries one
    pub name: Option<String>,
    pub end1: LinkableEnd,
    pub end2: LinkableEnd,
    pub crosslink_mass: Decimal,
    pub monolink_masses: Vec<Decimal>,
}

#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct KojakConf {
    pub crosslinker: Option<Crosslinker>,
    /// Residue -> mass for `fixed_modification` entries
    pub static_modifications: BTreeMap<String, Decimal>,
    /// Prefix Kojak used to mark shuffled decoy proteins
    pub decoy_filter: Option<String>,
    /// Prefix marking heavy-nitrogen labeled proteins
    pub filter_15n: Option<String>,
}

impl KojakConf {
    pub fn parse(contents: &str) -> Result<KojakConf, KojakConfError> {
        let mut conf = KojakConf::default();
        let mut crosslink: Option<(LinkableEnd, LinkableEnd, Decimal, Option<String>)> = None;
        let mut monolinks = Vec::new();

        for raw in contents.lines() {
            let line = match raw.find('#') {
                Some(idx) => &raw[..idx],
                None => raw,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields = line.split_whitespace().collect::<Vec<_>>();
            if fields.len() < 2 || fields[1] != "=" {
                continue;
            }
            match fields[0] {
                "cross_link" => {
                    if fields.len() < 5 {
                        return Err(KojakConfError::Malformed(line.into()));
                    }
                    // the crosslinker name is optional, so the mass is either
                    // the last field or the one before it
                    let (mass, name) = match parse_mass(fields[fields.len() - 1]) {
                        Some(mass) => (mass, None),
                        None => {
                            let mass = parse_mass(fields[fields.len() - 2])
                                .ok_or_else(|| KojakConfError::InvalidMass(line.into()))?;
                            (mass, Some(fields[fields.len() - 1].to_string()))
                        }
                    };
                    crosslink = Some((
                        LinkableEnd::parse(fields[2]),
                        LinkableEnd::parse(fields[3]),
                        mass,
                        name,
                    ));
                }
                "mono_link" => {
                    if fields.len() < 4 {
                        return Err(KojakConfError::Malformed(line.into()));
                    }
                    let mass = parse_mass(fields[fields.len() - 1])
                        .ok_or_else(|| KojakConfError::InvalidMass(line.into()))?;
                    monolinks.push(mass);
                }
                "fixed_modification" => {
                    if fields.len() < 4 {
                        return Err(KojakConfError::Malformed(line.into()));
                    }
                    let mass = parse_mass(fields[3])
                        .ok_or_else(|| KojakConfError::InvalidMass(line.into()))?;
                    conf.static_modifications.insert(fields[2].into(), mass);
                }
                "decoy_filter" => {
                    if fields.len() < 3 {
                        return Err(KojakConfError::Malformed(line.into()));
                    }
                    conf.decoy_filter = Some(fields[2].into());
                }
                "15N_filter" => {
                    if fields.len() < 3 {
                        return Err(KojakConfError::Malformed(line.into()));
                    }
                    conf.filter_15n = Some(fields[2].into());
                }
                _ => {}
            }
        }

        if let Some((end1, end2, crosslink_mass, name)) = crosslink {
            conf.crosslinker = Some(Crosslinker {
                name,
                end1,
                end2,
                crosslink_mass,
                monolink_masses: monolinks,
            });
        }
        Ok(conf)
    }
}

fn parse_mass(token: &str) -> Option<Decimal> {
    token.parse::<Decimal>().ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use rust_decimal_macros::dec;

    const CONF: &str = r#"
# Kojak parameter file
cross_link = nK nK 138.0680742 BS3
mono_link = nK 155.0946
mono_link = nK 156.0786    # hydrolyzed

fixed_modification = C 57.02146

decoy_filter = random
15N_filter = 15N
enrichment = 0           #values between 0 and 1
"#;

    #[test]
    fn parse_conf() {
        let conf = KojakConf::parse(CONF).unwrap();
        let xl = conf.crosslinker.unwrap();
        assert_eq!(xl.name.as_deref(), Some("BS3"));
        assert_eq!(xl.crosslink_mass, dec!(138.0680742));
        assert_eq!(xl.monolink_masses, vec![dec!(155.0946), dec!(156.0786)]);
        assert!(xl.end1.links_n_terminus);
        assert!(!xl.end1.links_c_terminus);
        assert!(xl.end1.residues.contains(&'K'));
        assert_eq!(conf.static_modifications.get("C"), Some(&dec!(57.02146)));
        assert_eq!(conf.decoy_filter.as_deref(), Some("random"));
        assert_eq!(conf.filter_15n.as_deref(), Some("15N"));
    }

    #[test]
    fn crosslinker_name_is_optional() {
        let conf = KojakConf::parse("cross_link = nK DE 138.0680742").unwrap();
        let xl = conf.crosslinker.unwrap();
        assert_eq!(xl.name, None);
        assert_eq!(xl.crosslink_mass, dec!(138.0680742));
        assert_eq!(
            xl.end2.residues.iter().collect::<Vec<_>>(),
            vec![&'D', &'E']
        );
    }

    #[test]
    fn ignores_unknown_keys_and_comments() {
        let conf = KojakConf::parse("threads = 4\n# cross_link = nK nK 1.0 BS3\n").unwrap();
        assert!(conf.crosslinker.is_none());
        assert!(conf.static_modifications.is_empty());
    }

    #[test]
    fn bad_mass_is_an_error() {
        let err = KojakConf::parse("mono_link = nK junk").unwrap_err();
        assert!(matches!(err, KojakConfError::InvalidMass(_)));
    }
}
