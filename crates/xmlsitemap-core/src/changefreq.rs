//! Change frequency estimation.
//!
//! A link carries a running `(lastmod, changefreq, changecount)` triple instead
//! of its full modification history. [`record_modification`] folds a new edit
//! into that triple, [`calculate_changefreq`] derives an estimate from a full
//! history when one is available, and [`effective_changefreq`] lets a link that
//! went quiet drift towards "never" at render time.

use crate::link::LinkRecord;
use serde::{Deserialize, Serialize};

/// Change frequency hints written to `<changefreq>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    /// Changes roughly every minute.
    Always,
    /// Changes hourly.
    Hourly,
    /// Changes daily.
    Daily,
    /// Changes weekly.
    Weekly,
    /// Changes monthly.
    Monthly,
    /// Changes yearly.
    Yearly,
    /// Archived content.
    Never,
}

/// Upper bound in seconds for each bucket, in ascending order.
const BUCKETS: [(i64, ChangeFrequency); 6] = [
    (60, ChangeFrequency::Always),
    (3_600, ChangeFrequency::Hourly),
    (86_400, ChangeFrequency::Daily),
    (604_800, ChangeFrequency::Weekly),
    (2_419_200, ChangeFrequency::Monthly),
    (31_449_600, ChangeFrequency::Yearly),
];

impl ChangeFrequency {
    /// Map an interval in seconds to the first bucket that covers it.
    ///
    /// Returns `None` for non-positive intervals, which mean "unknown".
    pub fn from_interval(seconds: i64) -> Option<Self> {
        if seconds <= 0 {
            return None;
        }
        Some(
            BUCKETS
                .iter()
                .find(|(bound, _)| seconds <= *bound)
                .map_or(Self::Never, |(_, freq)| *freq),
        )
    }

    /// Keyword used in sitemap XML.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

impl std::fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mean gap between consecutive modification instants, in whole seconds.
///
/// Fewer than two observations give no interval and return 0.
pub fn calculate_changefreq(timestamps: &[i64]) -> i64 {
    if timestamps.len() < 2 {
        return 0;
    }
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let gaps: i64 = sorted.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    let count = i64::try_from(sorted.len() - 1).unwrap_or(i64::MAX);
    div_round(gaps, count)
}

/// Fold a modification at `now` into the link's running estimate.
///
/// `changefreq' = round((|now - lastmod| + changefreq) / 2)`. Each new gap
/// carries half the weight, so older gaps decay geometrically. This is an
/// exponentially weighted estimate and differs from the arithmetic mean that
/// [`calculate_changefreq`] gives for the same history. The first observation
/// (no `lastmod` yet) only records the timestamp.
pub fn record_modification(link: &mut LinkRecord, now: i64) {
    if link.lastmod > 0 {
        link.changefreq = div_round((now - link.lastmod).abs() + link.changefreq, 2);
    }
    link.changecount += 1;
    link.lastmod = now;
}

/// Changefreq used when rendering, decayed by the time since the last edit.
pub const fn effective_changefreq(link: &LinkRecord, now: i64) -> i64 {
    if link.lastmod > 0 {
        ((now - link.lastmod).abs() + link.changefreq) / 2
    } else {
        link.changefreq
    }
}

/// Integer division rounding half away from zero.
const fn div_round(numerator: i64, denominator: i64) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}
