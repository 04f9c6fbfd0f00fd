//! Blending estimator proportions with the caller's prior vector.

use super::proportions::RelatednessProportions;
use crate::{CompadreError, Result};
use std::fmt;

/// Caller-supplied prior, as received on the wire.
///
/// Only the first two entries (the two closest degrees) are consumed. Their
/// trimmed text is echoed back in the reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorVector {
    head: [String; 2],
    p0: f64,
    p1: f64,
}

impl PriorVector {
    /// Parse a comma-separated prior with at least two numeric entries.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut entries = raw.split(',').map(str::trim);
        let (Some(first), Some(second)) = (entries.next(), entries.next()) else {
            return Err(CompadreError::malformed(
                "prior",
                format!("expected at least 2 comma-separated values, got '{raw}'"),
            ));
        };

        Ok(Self {
            p0: parse_probability(first)?,
            p1: parse_probability(second)?,
            head: [first.to_string(), second.to_string()],
        })
    }

    /// Mass not already claimed by the two closest-degree priors.
    pub fn residual(&self) -> f64 {
        1.0 - (self.p0 + self.p1)
    }

    /// Spread the residual mass across the estimator's degree buckets.
    pub fn blend(&self, proportions: &RelatednessProportions) -> ResponseVector {
        let residual = self.residual();
        ResponseVector {
            head: self.head.clone(),
            blended: proportions.as_array().map(|p| p * residual),
        }
    }
}

fn parse_probability(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| CompadreError::malformed("prior", format!("'{value}' is not a number")))
}

/// The six-value reply: both prior entries followed by four blended shares.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseVector {
    head: [String; 2],
    blended: [f64; 4],
}

impl fmt::Display for ResponseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.head[0], self.head[1])?;
        for value in &self.blended {
            write!(f, ",{value}")?;
        }
        Ok(())
    }
}
