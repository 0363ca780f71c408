// src/watch/matcher.rs

//! Decides which watch rules a normalized event satisfies.

use crate::watch::event::{EventKind, NormalizedEvent};
use crate::watch::rules::WatchEntry;

/// Whether `rule` matches an event of `kind` at `path`.
///
/// Exact equality always matches. Removals additionally match when either
/// path is a raw string prefix of the other, so deleting a watched file's
/// directory (or a file under a watched directory) fires the rule. The
/// comparison is on strings, not path components: `/a/b` matches `/a/bc`.
pub fn rule_matches(rule: &WatchEntry, kind: EventKind, path: &str) -> bool {
    let watched = rule.watched_path.as_str();
    if path == watched {
        return true;
    }
    kind == EventKind::Remove && (watched.starts_with(path) || path.starts_with(watched))
}

/// All rules matched by `event`, in rule order. No dedup across rules.
pub fn matching_rules<'a>(
    rules: &'a [WatchEntry],
    event: &NormalizedEvent,
) -> impl Iterator<Item = &'a WatchEntry> + 'a {
    let kind = event.kind;
    let path = event.affected_path.clone();
    rules
        .iter()
        .filter(move |rule| rule_matches(rule, kind, &path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(watched: &str) -> WatchEntry {
        WatchEntry::new(watched, "/proj/tools/on_change.py")
    }

    #[test]
    fn non_removal_requires_exact_path() {
        let r = rule("/proj/scripts");
        assert!(rule_matches(&r, EventKind::ModifyContent, "/proj/scripts"));
        assert!(!rule_matches(&r, EventKind::ModifyContent, "/proj/scripts/a.py"));
        assert!(!rule_matches(&r, EventKind::Create, "/proj"));
    }

    #[test]
    fn removal_matches_descendants_and_ancestors() {
        let r = rule("/proj/scripts");
        assert!(rule_matches(&r, EventKind::Remove, "/proj/scripts/a.py"));
        assert!(rule_matches(&r, EventKind::Remove, "/proj"));
        assert!(!rule_matches(&r, EventKind::Remove, "/other"));
    }

    #[test]
    fn removal_prefix_crosses_name_boundaries() {
        let r = rule("/a/b");
        assert!(rule_matches(&r, EventKind::Remove, "/a/bc"));
        assert!(!rule_matches(&r, EventKind::ModifyContent, "/a/bc"));
    }

    #[test]
    fn every_matching_rule_is_returned() {
        let rules = vec![rule("/proj/a"), rule("/proj/b"), rule("/proj/a")];
        let event = NormalizedEvent {
            kind: EventKind::Remove,
            affected_path: "/proj".into(),
        };
        assert_eq!(matching_rules(&rules, &event).count(), 3);
    }
}
