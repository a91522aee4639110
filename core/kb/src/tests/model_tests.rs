// Path and File Name : /home/diamondeye/rebuild/core/kb/src/tests/model_tests.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Tests for the canonical entity model - feed tag mapping, label round-trips, event linkage validation

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::config::KbConfig;
    use crate::model::{IndicatorKind, NewAttributionEvent};

    #[test]
    fn test_feed_tag_mapping() {
        assert_eq!(IndicatorKind::from_feed_tag("IPv4"), Some(IndicatorKind::IPv4));
        assert_eq!(IndicatorKind::from_feed_tag("ip-src"), Some(IndicatorKind::IPv4));
        assert_eq!(IndicatorKind::from_feed_tag("ip-dst"), Some(IndicatorKind::IPv4));
        assert_eq!(IndicatorKind::from_feed_tag("hostname"), Some(IndicatorKind::Domain));
        assert_eq!(IndicatorKind::from_feed_tag("url"), Some(IndicatorKind::Url));
        assert_eq!(IndicatorKind::from_feed_tag("URL"), Some(IndicatorKind::Url));
        assert_eq!(
            IndicatorKind::from_feed_tag("FileHash-SHA256"),
            Some(IndicatorKind::FileHashSha256)
        );

        // Unsupported source tags must not map
        assert_eq!(IndicatorKind::from_feed_tag("email-src"), None);
        assert_eq!(IndicatorKind::from_feed_tag("yara"), None);
        assert_eq!(IndicatorKind::from_feed_tag(""), None);
    }

    #[test]
    fn test_canonical_label_round_trip() {
        for kind in [
            IndicatorKind::IPv4,
            IndicatorKind::IPv6,
            IndicatorKind::Domain,
            IndicatorKind::Url,
            IndicatorKind::FileHashSha256,
        ] {
            assert_eq!(IndicatorKind::from_label(kind.as_str()), Some(kind));
        }
        assert_eq!(IndicatorKind::from_label("bogus"), None);
    }

    #[test]
    fn test_event_linkage() {
        let mut event = NewAttributionEvent {
            description: "sighting".to_string(),
            adversary_id: 1,
            indicator_id: Some(7),
            capability_id: None,
            technique_id: None,
            event_time: Utc::now(),
            confidence_score: 0.8,
        };
        assert!(event.is_linked());

        event.indicator_id = None;
        event.technique_id = Some("T1003".to_string());
        assert!(event.is_linked());

        // Degenerate: neither indicator nor technique
        event.technique_id = None;
        assert!(!event.is_linked());
    }

    #[test]
    fn test_connection_string() {
        let cfg = KbConfig {
            host: "db.internal".to_string(),
            port: 5432,
            name: "diamondeye".to_string(),
            user: "intel".to_string(),
            pass: "secret".to_string(),
            schema_sql_path: None,
        };
        assert_eq!(
            cfg.connection_string(),
            "host=db.internal port=5432 dbname=diamondeye user=intel password=secret"
        );
    }
}
