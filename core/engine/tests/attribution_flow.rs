// Path and File Name : /home/diamondeye/rebuild/core/engine/tests/attribution_flow.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: End-to-end attribution flow - feed and knowledge base ingestion through the pipeline, then correlation verdicts over the same store

use engine::{Correlator, Verdict};
use ingest::{
    run_feed_ingestion, run_knowledge_base_ingestion, BatchTuning, FeedBatch, GroupProfile,
    KnowledgeBaseSnapshot, RawRecord, SourceClass,
};
use kb::{telemetry, AdversaryProfile, MemoryStore, TechniqueRecord};

fn tracker_batch() -> FeedBatch {
    FeedBatch {
        source_name: "APT-X".to_string(),
        source_class: SourceClass::C2Tracker,
        label: "Confirmed C2 infrastructure".to_string(),
        records: vec![RawRecord {
            kind: "IPv4".to_string(),
            value: "1.2.3.4".to_string(),
            context: "APT-X staging server".to_string(),
        }],
    }
}

fn attack_snapshot() -> KnowledgeBaseSnapshot {
    KnowledgeBaseSnapshot {
        techniques: vec![
            TechniqueRecord {
                tid: "T1003".to_string(),
                name: "OS Credential Dumping".to_string(),
                description: "Dumping credentials from the OS".to_string(),
            },
            TechniqueRecord {
                tid: "T1059".to_string(),
                name: "Command and Scripting Interpreter".to_string(),
                description: "Abuse of command interpreters".to_string(),
            },
            TechniqueRecord {
                tid: "T1071".to_string(),
                name: "Application Layer Protocol".to_string(),
                description: "C2 over application protocols".to_string(),
            },
        ],
        groups: vec![GroupProfile {
            profile: AdversaryProfile {
                name: "APT-Y".to_string(),
                description: Some("Espionage group".to_string()),
                aliases: vec!["SILVER-Y".to_string()],
            },
            technique_tids: vec!["T1003".to_string(), "T1059".to_string()],
        }],
    }
}

#[tokio::test]
async fn test_ingested_indicator_correlates_as_known() {
    telemetry::init();
    let mut store = MemoryStore::new();

    let summary = run_feed_ingestion(&mut store, BatchTuning::default(), &[tracker_batch()])
        .await
        .unwrap();
    assert_eq!(summary.events_written, 1);

    let mut correlator = Correlator::new(store);
    let result = correlator.correlate("1.2.3.4", &[]).await.unwrap();

    assert_eq!(result.verdict, Verdict::Known);
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].adversary, "APT-X");
    assert_eq!(result.matches[0].score, 0.95);
}

#[tokio::test]
async fn test_unseen_indicator_correlates_by_observed_techniques() {
    telemetry::init();
    let mut store = MemoryStore::new();

    run_knowledge_base_ingestion(&mut store, BatchTuning::default(), &attack_snapshot())
        .await
        .unwrap();

    let mut correlator = Correlator::new(store);
    let observed = vec![
        "T1003".to_string(),
        "T1059".to_string(),
        "T1071".to_string(),
    ];
    let result = correlator.correlate("9.9.9.9", &observed).await.unwrap();

    assert_eq!(result.verdict, Verdict::HeuristicMatch);
    assert_eq!(result.confidence, 0.67);
    let top = &result.matches[0];
    assert_eq!(top.adversary, "APT-Y");
    assert_eq!(top.matched_ttps, Some(2));
    assert_eq!(top.score, 0.67);
}

#[tokio::test]
async fn test_mixed_ingestion_supports_both_stages_and_reads() {
    telemetry::init();
    let mut store = MemoryStore::new();

    run_knowledge_base_ingestion(&mut store, BatchTuning::default(), &attack_snapshot())
        .await
        .unwrap();
    run_feed_ingestion(&mut store, BatchTuning::default(), &[tracker_batch()])
        .await
        .unwrap();

    let mut correlator = Correlator::new(store);

    let known = correlator.correlate("1.2.3.4", &[]).await.unwrap();
    assert_eq!(known.verdict, Verdict::Known);

    let heuristic = correlator
        .correlate("8.8.4.4", &["T1059".to_string()])
        .await
        .unwrap();
    assert_eq!(heuristic.verdict, Verdict::HeuristicMatch);
    assert_eq!(heuristic.confidence, 1.0);

    let unknown = correlator.correlate("8.8.4.4", &[]).await.unwrap();
    assert_eq!(unknown.verdict, Verdict::Unknown);
    assert!(unknown.matches.is_empty());

    let summary = correlator.summary().await.unwrap();
    assert_eq!(summary.adversaries, 2);
    assert_eq!(summary.indicators, 1);
    assert_eq!(summary.events, 3);

    let inventory = correlator
        .adversary_inventory("APT-Y")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(inventory.techniques, vec!["T1003", "T1059"]);
    assert!(inventory.indicators.is_empty());
}
