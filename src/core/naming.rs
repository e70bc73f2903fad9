//! core::naming
//!
//! Index generation naming.
//!
//! # Convention
//!
//! - Generation 0 is the bare branch name (a legacy index, or an alias
//!   maintained outside mapsync).
//! - Generation `n >= 1` is `<branch>_<n>`.
//!
//! The active index for a branch is the existing one with the highest
//! generation. Drift creates generation `active + 1`, so the first index a
//! branch gets is `<branch>_1` and a second drift never collides with it.
//!
//! Branch names may themselves look like generations: the bare name of
//! branch `release_1` is generation 1 of branch `release`. mapsync never
//! creates generation 0, so such a bare name is attributed to the sibling
//! (see [`claimed_by`]).

use super::types::{IndexName, TypeError};

/// Separator between the branch name and the generation number.
pub const GENERATION_SEPARATOR: char = '_';

/// Name of generation `generation` of the index looked up as `lookup`.
///
/// # Example
///
/// ```
/// use mapsync::core::naming::generation_index;
/// use mapsync::core::types::IndexName;
///
/// let lookup = IndexName::new("master").unwrap();
/// assert_eq!(generation_index(&lookup, 1).unwrap().as_str(), "master_1");
/// assert_eq!(generation_index(&lookup, 0).unwrap().as_str(), "master");
/// ```
pub fn generation_index(lookup: &IndexName, generation: u32) -> Result<IndexName, TypeError> {
    if generation == 0 {
        return Ok(lookup.clone());
    }
    IndexName::new(format!(
        "{}{}{}",
        lookup.as_str(),
        GENERATION_SEPARATOR,
        generation
    ))
}

/// Generation of `index` relative to `lookup`, if it belongs to it.
///
/// `master_foo_1` is not a generation of `master`; only a purely numeric
/// suffix counts.
///
/// # Example
///
/// ```
/// use mapsync::core::naming::generation_of;
///
/// assert_eq!(generation_of("master", "master"), Some(0));
/// assert_eq!(generation_of("master", "master_3"), Some(3));
/// assert_eq!(generation_of("master", "master_foo_1"), None);
/// ```
pub fn generation_of(lookup: &str, index: &str) -> Option<u32> {
    if index == lookup {
        return Some(0);
    }
    let suffix = index
        .strip_prefix(lookup)?
        .strip_prefix(GENERATION_SEPARATOR)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok().filter(|g| *g > 0)
}

/// Pick the active index among `candidates`: the highest generation of `lookup`.
///
/// Names that are not generations of `lookup` are ignored.
pub fn active_index<'a, I>(lookup: &str, candidates: I) -> Option<(&'a str, u32)>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter_map(|name| generation_of(lookup, name).map(|g| (name, g)))
        .max_by_key(|(_, g)| *g)
}

/// The sibling whose generations include the bare name `lookup`, if any.
///
/// # Example
///
/// ```
/// use mapsync::core::naming::claimed_by;
///
/// assert_eq!(claimed_by("release_1", ["release", "release_1"]), Some("release"));
/// assert_eq!(claimed_by("release", ["release", "release_1"]), None);
/// ```
pub fn claimed_by<'a, I>(lookup: &str, siblings: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    siblings
        .into_iter()
        .find(|sibling| *sibling != lookup && generation_of(sibling, lookup).is_some())
}

/// Generation to create after `active` (1 when there is no index yet).
pub fn next_generation(active: Option<u32>) -> u32 {
    active.map_or(1, |g| g.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_index_appends_suffix() {
        let lookup = IndexName::new("staging").unwrap();
        assert_eq!(generation_index(&lookup, 1).unwrap().as_str(), "staging_1");
        assert_eq!(generation_index(&lookup, 12).unwrap().as_str(), "staging_12");
    }

    #[test]
    fn generation_index_respects_length_limit() {
        let lookup = IndexName::new("a".repeat(IndexName::MAX_LEN)).unwrap();
        assert!(generation_index(&lookup, 1).is_err());
    }

    #[test]
    fn generation_of_rejects_non_numeric() {
        assert_eq!(generation_of("master", "master_"), None);
        assert_eq!(generation_of("master", "master_x"), None);
        assert_eq!(generation_of("master", "master_1a"), None);
        assert_eq!(generation_of("master", "master-1"), None);
        assert_eq!(generation_of("master", "master_0"), None);
        assert_eq!(generation_of("master", "staging_1"), None);
    }

    #[test]
    fn generation_of_tolerates_leading_zeros() {
        assert_eq!(generation_of("master", "master_007"), Some(7));
    }

    #[test]
    fn active_index_picks_highest_generation() {
        let names = ["master_2", "master", "master_10", "master_foo_99", "other_50"];
        assert_eq!(active_index("master", names), Some(("master_10", 10)));
    }

    #[test]
    fn active_index_none_when_unrelated() {
        assert_eq!(active_index("master", ["staging_1", "mast"]), None);
        assert_eq!(active_index("master", std::iter::empty()), None);
    }

    #[test]
    fn claimed_by_needs_numeric_suffix() {
        let branches = ["release", "release_1", "release_x", "release_1_2"];
        assert_eq!(claimed_by("release_1", branches), Some("release"));
        assert_eq!(claimed_by("release_1_2", branches), Some("release_1"));
        assert_eq!(claimed_by("release_x", branches), None);
        assert_eq!(claimed_by("release", branches), None);
        assert_eq!(claimed_by("hotfix_3", branches), None);
    }

    #[test]
    fn next_generation_starts_at_one() {
        assert_eq!(next_generation(None), 1);
        assert_eq!(next_generation(Some(0)), 1);
        assert_eq!(next_generation(Some(4)), 5);
    }
}
