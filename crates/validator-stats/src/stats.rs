use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use semver::Version;

/// Blocks the first penalty query looks back before any watermark exists.
///
/// Ten 6 s blocks cover one polling interval.
pub const INITIAL_LOOKBACK_BLOCKS: u64 = 10;

/// Blocks of extrinsics searched for witness transactions.
///
/// An hour of 6 s blocks leaves room for slow Bitcoin blocks.
pub const OBSERVATION_WINDOW_BLOCKS: u64 = 600;

/// Reputation spread over the active set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReputationDistribution {
    /// Highest reputation.
    pub best: f64,

    /// Lowest reputation.
    pub worst: f64,

    /// Arithmetic mean.
    pub average: f64,

    /// Median.
    pub median: f64,

    /// Reputation at rank `N / 10` in ascending order; the bottom decile
    /// lies below it.
    pub worst_top10_threshold: f64,
}

impl ReputationDistribution {
    /// Computes the distribution, or `None` for an empty set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_points(points: &[f64]) -> Option<Self> {
        let mut sorted = points.to_vec();
        sorted.sort_by(f64::total_cmp);

        let worst = *sorted.first()?;
        let best = *sorted.last()?;
        let average = sorted.iter().sum::<f64>() / sorted.len() as f64;

        Some(Self {
            best,
            worst,
            average,
            median: median_of_sorted(&sorted)?,
            worst_top10_threshold: sorted[sorted.len() / 10],
        })
    }
}

/// Median of `values`, averaging the two middle values for even counts.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    median_of_sorted(&sorted)
}

fn median_of_sorted(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most common version string.
///
/// Ties go to the greatest semantic version; strings that don't parse as one
/// rank below those that do and fall back to lexicographic order.
#[must_use]
pub fn majority_version<'a, I>(versions: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = HashMap::<&str, usize>::new();
    for version in versions {
        *counts.entry(version).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a, a_count), (b, b_count)| {
            a_count
                .cmp(b_count)
                .then_with(|| compare_versions(a, b))
        })
        .map(|(version, _)| version.to_string())
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let parsed_a = Version::parse(a.trim_start_matches('v')).ok();
    let parsed_b = Version::parse(b.trim_start_matches('v')).ok();

    parsed_a.cmp(&parsed_b).then_with(|| a.cmp(b))
}

/// Sums penalty amounts per reason.
#[must_use]
pub fn penalties_by_reason<'a, I>(penalties: I) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut totals = BTreeMap::new();
    for (reason, amount) in penalties {
        *totals.entry(reason.to_string()).or_insert(0) += amount;
    }

    totals
}

/// Highest observed block height per external chain.
#[must_use]
pub fn latest_observations<I>(observations: I) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = (String, u64)>,
{
    let mut latest = BTreeMap::<String, u64>::new();
    for (chain, height) in observations {
        let entry = latest.entry(chain).or_insert(height);
        *entry = (*entry).max(height);
    }

    latest
}

/// Chain name of a witness call kind such as `BitcoinChainTracking`.
#[must_use]
pub fn tracked_chain(kind: &str) -> Option<&str> {
    kind.strip_suffix("ChainTracking")
        .filter(|chain| !chain.is_empty() && chain.chars().all(|c| c.is_ascii_alphabetic()))
}

/// Block range already scanned for penalties.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PenaltyWindow {
    last_block_monitored: Option<u64>,
    /// Start of the first lookback, pinned until a cycle succeeds.
    initial_start: Option<u64>,
}

impl PenaltyWindow {
    /// Highest block already accounted for, if any cycle succeeded.
    #[must_use]
    pub const fn last_block_monitored(&self) -> Option<u64> {
        self.last_block_monitored
    }

    /// Block id the next query must exceed, given the current chain height.
    ///
    /// Before the first success the lookback is anchored at the height of the
    /// first attempt, so a failed first cycle leaves no gap behind it.
    pub fn start_block(&mut self, current_height: u64) -> u64 {
        match self.last_block_monitored {
            Some(block) => block,
            None => *self
                .initial_start
                .get_or_insert(current_height.saturating_sub(INITIAL_LOOKBACK_BLOCKS)),
        }
    }

    /// Records that every block up to `height` has been scanned. Never moves
    /// backwards.
    pub fn advance(&mut self, height: u64) {
        self.last_block_monitored = Some(
            self.last_block_monitored
                .map_or(height, |block| block.max(height)),
        );
    }
}
