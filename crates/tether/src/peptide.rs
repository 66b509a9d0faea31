use fnv::{FnvHashMap, FnvHashSet};
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;

/// Placeholder residue used when collapsing leucine/isoleucine variants
/// into a single comparison key.
const IL_PLACEHOLDER: &str = "=";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkType {
    #[default]
    Unlinked,
    Looplink,
    Crosslink,
}

impl LinkType {
    /// Map the `xlink_type` attribute value reported by Kojak.
    pub fn from_xlink_type(tag: &str) -> Option<LinkType> {
        match tag {
            "na" => Some(LinkType::Unlinked),
            "loop" => Some(LinkType::Looplink),
            "xl" => Some(LinkType::Crosslink),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Unlinked => "unlinked",
            LinkType::Looplink => "looplink",
            LinkType::Crosslink => "crosslink",
        }
    }
}

/// One peptide observed by the search, with positional modifications.
///
/// `modifications` maps 1-based residue positions to the variable masses
/// reported at that position. `target_proteins` is the set of candidate
/// (non-decoy) protein names the validation pipeline listed for this
/// peptide - an over-approximation until the protein matcher confirms it.
#[derive(Clone, Debug, Default)]
pub struct Peptide {
    pub sequence: String,
    pub modifications: FnvHashMap<u32, std::collections::BTreeSet<Decimal>>,
    pub isotope_label: Option<String>,
    pub target_proteins: FnvHashSet<String>,
}

impl Peptide {
    pub fn new<S: Into<String>>(sequence: S) -> Peptide {
        Peptide {
            sequence: sequence.into(),
            ..Default::default()
        }
    }

    pub fn add_modification(&mut self, position: u32, mass: Decimal) {
        self.modifications.entry(position).or_default().insert(mass);
    }
}

impl std::fmt::Display for Peptide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, residue) in self.sequence.chars().enumerate() {
            write!(f, "{}", residue)?;
            if let Some(masses) = self.modifications.get(&(idx as u32 + 1)) {
                if !masses.is_empty() {
                    let rendered = masses
                        .iter()
                        .map(|mass| {
                            let mut m = mass
                                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                            m.rescale(2);
                            m.to_string()
                        })
                        .collect::<Vec<_>>()
                        .join(",");
                    write!(f, "[{}]", rendered)?;
                }
            }
        }
        if let Some(label) = &self.isotope_label {
            write!(f, "-{}", label)?;
        }
        Ok(())
    }
}

/// Canonical identity of one identification, used as the aggregation key
/// across PSMs. Equality, hashing, and ordering all derive solely from the
/// canonical string rendered by `Display`, so two reported peptides with the
/// same sequences, modifications, and link positions are the same key no
/// matter how they were encountered.
#[derive(Clone, Debug)]
pub enum ReportedPeptide {
    Unlinked {
        peptide: Peptide,
    },
    Looplink {
        peptide: Peptide,
        position1: u32,
        position2: u32,
    },
    Crosslink {
        peptide1: Peptide,
        position1: u32,
        peptide2: Peptide,
        position2: u32,
    },
}

impl ReportedPeptide {
    pub fn unlinked(peptide: Peptide) -> ReportedPeptide {
        ReportedPeptide::Unlinked { peptide }
    }

    /// Build a looplink, enforcing `position1 <= position2`.
    pub fn looplink(peptide: Peptide, position_a: u32, position_b: u32) -> ReportedPeptide {
        let (position1, position2) = if position_a <= position_b {
            (position_a, position_b)
        } else {
            (position_b, position_a)
        };
        ReportedPeptide::Looplink {
            peptide,
            position1,
            position2,
        }
    }

    /// Build a crosslink in canonical order: the lexicographically smaller
    /// peptide string goes first, and with equal peptide strings the smaller
    /// position goes first. Any two reported peptides containing the same
    /// two peptides and linked positions are recognized as the same key.
    pub fn crosslink(
        peptide_a: Peptide,
        position_a: u32,
        peptide_b: Peptide,
        position_b: u32,
    ) -> ReportedPeptide {
        match peptide_a.to_string().cmp(&peptide_b.to_string()) {
            Ordering::Greater => ReportedPeptide::Crosslink {
                peptide1: peptide_b,
                position1: position_b,
                peptide2: peptide_a,
                position2: position_a,
            },
            Ordering::Equal => ReportedPeptide::Crosslink {
                peptide1: peptide_a,
                position1: position_a.min(position_b),
                peptide2: peptide_b,
                position2: position_a.max(position_b),
            },
            Ordering::Less => ReportedPeptide::Crosslink {
                peptide1: peptide_a,
                position1: position_a,
                peptide2: peptide_b,
                position2: position_b,
            },
        }
    }

    pub fn link_type(&self) -> LinkType {
        match self {
            ReportedPeptide::Unlinked { .. } => LinkType::Unlinked,
            ReportedPeptide::Looplink { .. } => LinkType::Looplink,
            ReportedPeptide::Crosslink { .. } => LinkType::Crosslink,
        }
    }

    pub fn peptide1(&self) -> &Peptide {
        match self {
            ReportedPeptide::Unlinked { peptide } => peptide,
            ReportedPeptide::Looplink { peptide, .. } => peptide,
            ReportedPeptide::Crosslink { peptide1, .. } => peptide1,
        }
    }

    pub fn peptide2(&self) -> Option<&Peptide> {
        match self {
            ReportedPeptide::Crosslink { peptide2, .. } => Some(peptide2),
            _ => None,
        }
    }

    /// Member peptides, in canonical order.
    pub fn peptides(&self) -> impl Iterator<Item = &Peptide> {
        std::iter::once(self.peptide1()).chain(self.peptide2())
    }

    /// The non-canonical arrangement of a crosslink, with the two sides
    /// exchanged. Used when testing leucine/isoleucine equivalence, where
    /// collapsing I and L can change which ordering lines up.
    pub fn swapped(&self) -> Option<ReportedPeptide> {
        match self {
            ReportedPeptide::Crosslink {
                peptide1,
                position1,
                peptide2,
                position2,
            } => Some(ReportedPeptide::Crosslink {
                peptide1: peptide2.clone(),
                position1: *position2,
                peptide2: peptide1.clone(),
                position2: *position1,
            }),
            _ => None,
        }
    }

    /// Canonical string with every I and L replaced by a placeholder, so
    /// near-isobaric leucine/isoleucine variants compare equal.
    pub fn il_collapsed(&self) -> String {
        self.to_string()
            .replace('I', IL_PLACEHOLDER)
            .replace('L', IL_PLACEHOLDER)
    }
}

impl std::fmt::Display for ReportedPeptide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportedPeptide::Unlinked { peptide } => write!(f, "{}", peptide),
            ReportedPeptide::Looplink {
                peptide,
                position1,
                position2,
            } => write!(f, "{}({},{})", peptide, position1, position2),
            ReportedPeptide::Crosslink {
                peptide1,
                position1,
                peptide2,
                position2,
            } => write!(
                f,
                "{}({})-{}({})",
                peptide1, position1, peptide2, position2
            ),
        }
    }
}

impl PartialEq for ReportedPeptide {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for ReportedPeptide {}

impl std::hash::Hash for ReportedPeptide {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl PartialOrd for ReportedPeptide {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReportedPeptide {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn render_modifications() {
        let mut peptide = Peptide::new("PEPTIDE");
        peptide.add_modification(3, dec!(15.994));
        peptide.add_modification(3, dec!(12.29));
        peptide.add_modification(5, dec!(57.02146));

        // masses per position sorted numerically, rounded half-up to 2 places
        assert_eq!(peptide.to_string(), "PEP[12.29,15.99]TI[57.02]DE");
    }

    #[test]
    fn render_pads_scale() {
        let mut peptide = Peptide::new("GCMG");
        peptide.add_modification(2, dec!(57));
        assert_eq!(peptide.to_string(), "GC[57.00]MG");
    }

    #[test]
    fn render_isotope_label() {
        let mut peptide = Peptide::new("PEPTIDE");
        peptide.isotope_label = Some("15N".into());
        assert_eq!(peptide.to_string(), "PEPTIDE-15N");
    }

    #[test]
    fn crosslink_order_independent() {
        let a = ReportedPeptide::crosslink(Peptide::new("AAAK"), 4, Peptide::new("CCCK"), 1);
        let b = ReportedPeptide::crosslink(Peptide::new("CCCK"), 1, Peptide::new("AAAK"), 4);

        assert_eq!(a.to_string(), "AAAK(4)-CCCK(1)");
        assert_eq!(a, b);

        let mut set = fnv::FnvHashSet::default();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn crosslink_equal_peptides_sorts_positions() {
        let rp =
            ReportedPeptide::crosslink(Peptide::new("PEPKTIDK"), 8, Peptide::new("PEPKTIDK"), 4);
        assert_eq!(rp.to_string(), "PEPKTIDK(4)-PEPKTIDK(8)");
    }

    #[test]
    fn looplink_positions_sorted() {
        let rp = ReportedPeptide::looplink(Peptide::new("PEPKTIDKE"), 8, 4);
        assert_eq!(rp.to_string(), "PEPKTIDKE(4,8)");
        match rp {
            ReportedPeptide::Looplink {
                position1,
                position2,
                ..
            } => assert!(position1 <= position2),
            _ => unreachable!(),
        }
    }

    #[test]
    fn il_collapse() {
        let a = ReportedPeptide::unlinked(Peptide::new("PEPTLDE"));
        let b = ReportedPeptide::unlinked(Peptide::new("PEPTIDE"));
        assert_ne!(a, b);
        assert_eq!(a.il_collapsed(), b.il_collapsed());
        assert_eq!(a.il_collapsed(), "PEPT=DE");
    }

    #[test]
    fn il_collapse_crosslink_swapped() {
        // canonical orderings differ between the I and L spellings, so the
        // collapsed keys only line up after trying the swapped arrangement
        let a = ReportedPeptide::crosslink(Peptide::new("IIIK"), 4, Peptide::new("KKKR"), 1);
        let b = ReportedPeptide::crosslink(Peptide::new("LLLK"), 4, Peptide::new("KKKR"), 1);

        assert_eq!(a.to_string(), "IIIK(4)-KKKR(1)");
        assert_eq!(b.to_string(), "KKKR(1)-LLLK(4)");
        assert_ne!(a.il_collapsed(), b.il_collapsed());
        let swapped = b.swapped().unwrap();
        assert_eq!(a.il_collapsed(), swapped.il_collapsed());
    }
}
