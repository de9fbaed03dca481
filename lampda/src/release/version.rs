//! Release tag ordering.
//!
//! Tags are ranked by a positional digit score rather than semantic
//! versioning: every digit character adds `digit * weight`, the weight
//! starting at 1,000,000 and halving after each digit. Only tags of the same
//! shape order reliably (`v1.10.0` scores below `v1.9.0`). Latest-release
//! selection depends on this exact score.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::release::Release;

/// Weight of the first digit of a tag.
const FIRST_DIGIT_WEIGHT: f64 = 1_000_000.0;

/// Score of a tag; higher is newer.
pub fn version_score(tag: &str) -> f64 {
    let mut weight = FIRST_DIGIT_WEIGHT;
    let mut score = 0.0;
    for digit in tag.chars().filter_map(|c| c.to_digit(10)) {
        score += f64::from(digit) * weight;
        weight /= 2.0;
    }
    score
}

/// Order two tags by [`version_score`].
pub fn compare_tags(a: &str, b: &str) -> Ordering {
    version_score(a).total_cmp(&version_score(b))
}

/// The release with the highest tag score.
///
/// On equal scores the earliest release in `releases` wins.
pub fn select_latest(releases: &[Release]) -> Result<&Release> {
    let mut iter = releases.iter();
    let first = iter.next().ok_or(Error::EmptyCatalog)?;
    Ok(iter.fold(first, |best, candidate| {
        if compare_tags(&candidate.tag, &best.tag) == Ordering::Greater {
            candidate
        } else {
            best
        }
    }))
}
