// Path and File Name : /home/diamondeye/rebuild/core/ingest/src/tests/resolver_tests.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Tests for the identity resolver - get-or-create mapping, idempotence for pre-existing keys, partial results on insert failure

#[cfg(test)]
mod tests {
    use crate::batch::{BatchTuning, BatchWriter};
    use crate::resolver::{resolve_adversaries, resolve_indicators};
    use kb::{AdversaryProfile, IndicatorCandidate, IndicatorKind, MemoryStore};

    fn candidate(value: &str) -> IndicatorCandidate {
        IndicatorCandidate {
            kind: IndicatorKind::IPv4,
            value: value.to_string(),
            description: "sighting".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_input_returns_empty_mapping_without_io() {
        // A dropped connection makes any store round-trip fail, so success
        // here proves the resolver performed no I/O at all.
        let mut store = MemoryStore::new();
        store.drop_connection();

        let map = resolve_adversaries(&mut store, &[]).await.unwrap();
        assert!(map.is_empty());

        let writer = BatchWriter::new(BatchTuning::default());
        let resolved = resolve_indicators(&mut store, &writer, &[]).await.unwrap();
        assert!(resolved.map.is_empty());
        assert!(resolved.outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_get_or_create_and_idempotence() {
        let mut store = MemoryStore::new();
        let profiles = vec![
            AdversaryProfile::named("APT-X"),
            AdversaryProfile::named("APT-Y"),
        ];

        let first = resolve_adversaries(&mut store, &profiles).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(store.call_counts().adversary_inserts, 1);

        // Every key pre-exists now: same mapping, zero insert operations.
        let second = resolve_adversaries(&mut store, &profiles).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(store.call_counts().adversary_inserts, 1);
    }

    #[tokio::test]
    async fn test_indicator_resolution_creates_missing_only() {
        let mut store = MemoryStore::new();
        let writer = BatchWriter::new(BatchTuning::default());

        let resolved = resolve_indicators(&mut store, &writer, &[candidate("1.2.3.4")])
            .await
            .unwrap();
        assert_eq!(resolved.map.len(), 1);
        assert_eq!(store.call_counts().indicator_inserts, 1);

        // One pre-existing, one new: the insert only carries the new value.
        let resolved = resolve_indicators(
            &mut store,
            &writer,
            &[candidate("1.2.3.4"), candidate("5.6.7.8")],
        )
        .await
        .unwrap();
        assert_eq!(resolved.map.len(), 2);
        assert_eq!(store.indicator_count(), 2);
        assert_eq!(store.call_counts().indicator_inserts, 2);

        // All pre-existing: zero insert operations.
        let resolved = resolve_indicators(
            &mut store,
            &writer,
            &[candidate("1.2.3.4"), candidate("5.6.7.8")],
        )
        .await
        .unwrap();
        assert_eq!(resolved.map.len(), 2);
        assert_eq!(store.call_counts().indicator_inserts, 2);
    }

    #[tokio::test]
    async fn test_adversary_insert_failure_returns_preexisting_mapping() {
        let mut store = MemoryStore::new();
        resolve_adversaries(&mut store, &[AdversaryProfile::named("APT-X")])
            .await
            .unwrap();

        // Second insert call (for the missing name) fails; the resolver
        // returns what pre-existing rows could resolve, and does not error.
        store.fail_adversary_insert_call(2);
        let map = resolve_adversaries(
            &mut store,
            &[
                AdversaryProfile::named("APT-X"),
                AdversaryProfile::named("APT-Z"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("APT-X"));
        assert_eq!(store.adversary_count(), 1);
    }

    #[tokio::test]
    async fn test_indicator_insert_failure_leaves_values_unresolved() {
        let mut store = MemoryStore::new();
        let writer = BatchWriter::new(BatchTuning::default());
        resolve_indicators(&mut store, &writer, &[candidate("1.2.3.4")])
            .await
            .unwrap();

        store.fail_indicator_insert_call(2);
        let resolved = resolve_indicators(
            &mut store,
            &writer,
            &[candidate("1.2.3.4"), candidate("5.6.7.8")],
        )
        .await
        .unwrap();

        // Pre-existing value resolves; the failed chunk's value does not.
        assert_eq!(resolved.map.len(), 1);
        assert!(resolved.map.contains_key("1.2.3.4"));
        assert_eq!(resolved.outcome.failed.len(), 1);
        assert_eq!(store.indicator_count(), 1);
    }
}
