//! Zone resolution
//!
//! An account may host both `foo.com` and the more specific `bar.foo.com`;
//! a record for `x.bar.foo.com` belongs to the latter.

use crate::domain_filter::is_label_suffix;
use crate::model::{Zone, normalize_name};

/// Pick the most specific zone that owns `record_name`
///
/// Returns `None` when no zone matches. Callers skip such records: they are
/// outside this account's authority, not a provider failure.
pub fn suitable_zone<'a>(record_name: &str, zones: &'a [Zone]) -> Option<&'a Zone> {
    let record_name = normalize_name(record_name);
    zones
        .iter()
        .filter(|zone| is_label_suffix(&record_name, &normalize_name(&zone.name)))
        .max_by_key(|zone| zone.name.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones() -> Vec<Zone> {
        vec![Zone::new("foo.com"), Zone::new("bar.foo.com"), Zone::new("baz.com")]
    }

    #[test]
    fn test_longest_suffix_wins() {
        let zones = zones();
        assert_eq!(
            suitable_zone("record.bar.foo.com", &zones).map(|z| z.name.as_str()),
            Some("bar.foo.com")
        );
        assert_eq!(
            suitable_zone("record.foo.com", &zones).map(|z| z.name.as_str()),
            Some("foo.com")
        );
    }

    #[test]
    fn test_no_zone_matches() {
        let zones = zones();
        assert!(suitable_zone("x.foo.de", &zones).is_none());
        assert!(suitable_zone("foo.de", &zones).is_none());
        assert!(suitable_zone("xfoo.com", &zones).is_none());
    }

    #[test]
    fn test_apex_record_matches_its_zone() {
        let zones = zones();
        assert_eq!(
            suitable_zone("BAZ.com.", &zones).map(|z| z.name.as_str()),
            Some("baz.com")
        );
    }

    #[test]
    fn test_empty_zone_list() {
        assert!(suitable_zone("a.foo.com", &[]).is_none());
    }
}
