//! Downstream dependency deduplication

use std::collections::HashSet;

use crate::models::{Dependent, TraceEntry};

use super::{co2, round2};

/// Method reported when a trace entry carries none
pub const DEFAULT_METHOD: &str = "GET";

/// Identity of a downstream dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyKey<'a> {
    /// Downstream container
    pub container: &'a str,
    /// Downstream API, absent in older traces
    pub api_name: Option<&'a str>,
}

impl<'a> From<&'a TraceEntry> for DependencyKey<'a> {
    fn from(entry: &'a TraceEntry) -> Self {
        Self {
            container: &entry.container,
            api_name: entry.api_name.as_deref(),
        }
    }
}

/// Flatten every record's trace of one API group into unique dependents.
///
/// The first entry seen for a `(container, apiName)` pair wins and later ones
/// are dropped even when their metrics differ. Output keeps first-seen order.
pub fn dedupe_dependents(traces: &[Vec<TraceEntry>]) -> Vec<Dependent> {
    let mut seen: HashSet<DependencyKey<'_>> = HashSet::new();

    traces
        .iter()
        .flatten()
        .filter(|entry| seen.insert(DependencyKey::from(*entry)))
        .map(|entry| Dependent {
            service: entry.container.clone(),
            kind: entry
                .method_name
                .clone()
                .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            co2: round2(co2(entry.total_energy_j)),
            energy: round2(entry.total_energy_j),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_first_occurrence_wins() {
        let traces = vec![
            vec![
                TraceEntry::new("A", "x", 10.0),
                TraceEntry::new("A", "x", 99.0).with_method("POST"),
            ],
            vec![TraceEntry::new("B", "y", 1000.0).with_method("PUT")],
        ];

        let dependents = dedupe_dependents(&traces);

        assert_eq!(
            dependents,
            vec![
                Dependent {
                    service: "A".into(),
                    kind: "GET".into(),
                    co2: 2.33,
                    energy: 10.0,
                },
                Dependent {
                    service: "B".into(),
                    kind: "PUT".into(),
                    co2: 233.0,
                    energy: 1000.0,
                },
            ]
        );
    }

    #[test]
    fn test_same_container_different_api_is_distinct() {
        let traces = vec![vec![
            TraceEntry::new("A", "x", 1.0),
            TraceEntry::new("A", "y", 1.0),
            TraceEntry {
                container: "A".into(),
                ..TraceEntry::default()
            },
        ]];
        assert_eq!(dedupe_dependents(&traces).len(), 3);
    }

    #[test]
    fn test_key_fields_do_not_collide() {
        // A string key like "a-b" + "c" vs "a" + "b-c" would merge these
        let traces = vec![vec![
            TraceEntry::new("a-b", "c", 1.0),
            TraceEntry::new("a", "b-c", 1.0),
        ]];
        assert_eq!(dedupe_dependents(&traces).len(), 2);
    }

    #[test]
    fn test_rounds_energy() {
        let traces = vec![vec![TraceEntry::new("A", "x", 658.4249)]];
        let dependents = dedupe_dependents(&traces);
        assert_eq!(dependents[0].energy, 658.42);
        assert_eq!(dependents[0].co2, 153.41);
    }

    proptest! {
        #[test]
        fn never_emits_duplicate_keys(
            pairs in prop::collection::vec(prop::collection::vec((0u8..4, 0u8..4), 0..6), 0..6)
        ) {
            let traces: Vec<Vec<TraceEntry>> = pairs
                .iter()
                .map(|trace| {
                    trace
                        .iter()
                        .map(|(c, a)| TraceEntry::new(format!("svc-{c}"), format!("api-{a}"), 1.0))
                        .collect()
                })
                .collect();

            let mut expected: Vec<(u8, u8)> = Vec::new();
            for pair in pairs.iter().flatten() {
                if !expected.contains(pair) {
                    expected.push(*pair);
                }
            }

            let dependents = dedupe_dependents(&traces);
            prop_assert_eq!(dependents.len(), expected.len());
            for (dependent, (c, _)) in dependents.iter().zip(&expected) {
                prop_assert_eq!(&dependent.service, &format!("svc-{c}"));
            }
        }
    }
}
