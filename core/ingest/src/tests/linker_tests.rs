// Path and File Name : /home/diamondeye/rebuild/core/ingest/src/tests/linker_tests.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Tests for the link builder - per-source confidence policy, unresolved-indicator drops, technique link filtering

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use chrono::Utc;

    use crate::linker::{
        build_indicator_events, build_technique_events, SourceClass, AGGREGATED_FEED_CONFIDENCE,
        C2_TRACKER_CONFIDENCE, KNOWLEDGE_BASE_CONFIDENCE,
    };
    use kb::{IndicatorCandidate, IndicatorKind};

    fn candidate(value: &str, description: &str) -> IndicatorCandidate {
        IndicatorCandidate {
            kind: IndicatorKind::IPv4,
            value: value.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_confidence_policy_per_source_class() {
        assert_eq!(SourceClass::KnowledgeBase.confidence(), KNOWLEDGE_BASE_CONFIDENCE);
        assert_eq!(SourceClass::C2Tracker.confidence(), C2_TRACKER_CONFIDENCE);
        assert_eq!(SourceClass::AggregatedFeed.confidence(), AGGREGATED_FEED_CONFIDENCE);
        assert_eq!(C2_TRACKER_CONFIDENCE, 0.95);
        assert_eq!(AGGREGATED_FEED_CONFIDENCE, 0.8);
    }

    #[test]
    fn test_unresolved_indicators_are_dropped_not_written() {
        let ids: HashMap<String, i64> = [("1.2.3.4".to_string(), 10)].into_iter().collect();
        let candidates = vec![
            candidate("1.2.3.4", "tracker: Emotet C2"),
            candidate("5.6.7.8", "tracker: QakBot C2"),
        ];
        let (events, report) = build_indicator_events(
            7,
            &candidates,
            &ids,
            SourceClass::C2Tracker,
            "tracker blocklist",
            Utc::now(),
        );

        assert_eq!(report.built, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.adversary_id, 7);
        assert_eq!(event.indicator_id, Some(10));
        assert_eq!(event.technique_id, None);
        assert_eq!(event.confidence_score, 0.95);
        assert_eq!(event.description, "tracker: Emotet C2");
    }

    #[test]
    fn test_empty_description_falls_back_to_label() {
        let ids: HashMap<String, i64> = [("evil.example".to_string(), 3)].into_iter().collect();
        let candidates = vec![IndicatorCandidate {
            kind: IndicatorKind::Domain,
            value: "evil.example".to_string(),
            description: String::new(),
        }];
        let (events, _) = build_indicator_events(
            1,
            &candidates,
            &ids,
            SourceClass::AggregatedFeed,
            "Indicator from pulse: Winter Campaign",
            Utc::now(),
        );
        assert_eq!(events[0].description, "Indicator from pulse: Winter Campaign");
        assert_eq!(events[0].confidence_score, 0.8);
    }

    #[test]
    fn test_technique_events_filter_unknown_and_existing() {
        let known: HashSet<String> = ["T1003".to_string(), "T1059".to_string()]
            .into_iter()
            .collect();
        let existing: HashSet<(i64, String)> = [(4, "T1059".to_string())].into_iter().collect();
        let tids = vec![
            "T1003".to_string(),
            "T1059".to_string(),
            "T1999".to_string(),
            "T1003".to_string(),
        ];

        let (events, report) =
            build_technique_events(4, "APT-X", &tids, &known, &existing, Utc::now());

        // T1003 built, T1059 already linked, T1999 unknown, duplicate ignored.
        assert_eq!(report.built, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.technique_id.as_deref(), Some("T1003"));
        assert_eq!(event.indicator_id, None);
        assert_eq!(event.confidence_score, 1.0);
        assert_eq!(event.description, "Knowledge base: APT-X uses T1003");
    }
}
