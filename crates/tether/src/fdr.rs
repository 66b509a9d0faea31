//! False discovery rate estimation from PeptideProphet/iProphet
//! probabilities.
//!
//! Every PSM contributes `1 - probability` (its chance of being wrong) to a
//! tally bucketed by exact probability. The estimated error at a score is
//! then the mean chance-of-being-wrong over all PSMs scoring at or above
//! it. Running one analysis per score type lets PeptideProphet and iProphet
//! cutoffs be reported side by side.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FdrError {
    #[error("The score: {0} was not found in this search.")]
    UnknownScore(Decimal),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct ProbabilitySum {
    count: u32,
    one_minus_sum: Decimal,
}

#[derive(Clone, Debug, Default)]
pub struct ErrorAnalysis {
    counters: BTreeMap<Decimal, ProbabilitySum>,
}

impl ErrorAnalysis {
    pub fn build(probabilities: impl Iterator<Item = Decimal>) -> ErrorAnalysis {
        let mut counters: BTreeMap<Decimal, ProbabilitySum> = BTreeMap::new();
        for p in probabilities {
            let counter = counters.entry(p).or_default();
            counter.count += 1;
            counter.one_minus_sum += Decimal::ONE - p;
        }
        ErrorAnalysis { counters }
    }

    /// Estimated FDR of accepting everything scoring at or above `score`,
    /// rounded to four places, banker's rounding.
    ///
    /// Only probabilities that were observed in the input are valid cutoffs.
    pub fn error(&self, score: Decimal) -> Result<Decimal, FdrError> {
        if !self.counters.contains_key(&score) {
            return Err(FdrError::UnknownScore(score));
        }
        let mut count = Decimal::ZERO;
        let mut one_minus_sum = Decimal::ZERO;
        for counter in self.counters.range(score..).map(|(_, c)| c) {
            count += Decimal::from(counter.count);
            one_minus_sum += counter.one_minus_sum;
        }
        Ok((one_minus_sum / count)
            .round_dp_with_strategy(4, RoundingStrategy::MidpointNearestEven))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cumulative_error_over_observed_scores() {
        let analysis =
            ErrorAnalysis::build([dec!(0.99), dec!(0.95), dec!(0.80)].into_iter());
        assert_eq!(analysis.error(dec!(0.99)).unwrap(), dec!(0.0100));
        assert_eq!(analysis.error(dec!(0.95)).unwrap(), dec!(0.0300));
        // 0.26 / 3, rounded at the fourth place
        assert_eq!(analysis.error(dec!(0.80)).unwrap(), dec!(0.0867));
    }

    #[test]
    fn duplicate_scores_accumulate() {
        let analysis = ErrorAnalysis::build([dec!(0.99), dec!(0.99)].into_iter());
        assert_eq!(analysis.error(dec!(0.99)).unwrap(), dec!(0.0100));
    }

    #[test]
    fn trailing_zeros_hit_the_same_bucket() {
        let analysis = ErrorAnalysis::build([dec!(0.9900)].into_iter());
        assert_eq!(analysis.error(dec!(0.99)).unwrap(), dec!(0.0100));
    }

    #[test]
    fn rounds_ties_to_even() {
        let analysis = ErrorAnalysis::build([dec!(0.99985)].into_iter());
        assert_eq!(analysis.error(dec!(0.99985)).unwrap(), dec!(0.0002));
        let analysis = ErrorAnalysis::build([dec!(0.99995)].into_iter());
        assert_eq!(analysis.error(dec!(0.99995)).unwrap(), dec!(0.0000));
    }

    #[test]
    fn unknown_score_is_an_error() {
        let analysis = ErrorAnalysis::build([dec!(0.99)].into_iter());
        let err = analysis.error(dec!(0.5)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The score: 0.5 was not found in this search."
        );
    }
}
