//! Degree-bucket proportions from estimator log-likelihoods.

use crate::estimator::ModelRow;

/// Disjoint degree buckets. Degrees outside `2..=40` belong to none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegreeBucket {
    Second,
    Third,
    FourthToNinth,
    Distant,
}

impl DegreeBucket {
    pub fn for_degree(degree: i64) -> Option<Self> {
        match degree {
            2 => Some(DegreeBucket::Second),
            3 => Some(DegreeBucket::Third),
            4..=9 => Some(DegreeBucket::FourthToNinth),
            10..=40 => Some(DegreeBucket::Distant),
            _ => None,
        }
    }

    fn slot(&self) -> usize {
        match self {
            DegreeBucket::Second => 0,
            DegreeBucket::Third => 1,
            DegreeBucket::FourthToNinth => 2,
            DegreeBucket::Distant => 3,
        }
    }
}

/// Normalized share of estimator likelihood in each degree bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelatednessProportions {
    pub second: f64,
    pub third: f64,
    pub fourth_to_ninth: f64,
    pub distant: f64,
}

impl RelatednessProportions {
    /// Bucket and normalize estimator rows.
    ///
    /// Each log-likelihood is exponentiated into an unnormalized weight,
    /// weights are summed per bucket and divided by the total of the four
    /// sums. Returns `None` when that total is zero or not finite (no
    /// in-range rows, or every weight underflowed), in which case the
    /// estimator carries no usable signal.
    pub fn from_rows(rows: &[ModelRow]) -> Option<Self> {
        let mut sums = [0.0_f64; 4];
        for row in rows {
            if let Some(bucket) = DegreeBucket::for_degree(row.degree) {
                sums[bucket.slot()] += row.log_likelihood.exp();
            }
        }

        let total: f64 = sums.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return None;
        }

        Some(Self {
            second: sums[0] / total,
            third: sums[1] / total,
            fourth_to_ninth: sums[2] / total,
            distant: sums[3] / total,
        })
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.second, self.third, self.fourth_to_ninth, self.distant]
    }
}
