// Path and File Name : /home/diamondeye/rebuild/core/kb/src/pg.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: PostgreSQL implementation of the knowledge store - parameterized set binding, transactional batch writes, idempotent schema apply

use std::collections::{HashMap, HashSet};
use std::fs;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

use crate::config::KbConfig;
use crate::errors::KbError;
use crate::model::{
    AdversaryInventory, AdversaryProfile, AttributionLink, IndicatorCandidate, IndicatorKind,
    IndicatorRow, KbSummary, NewAttributionEvent, TechniqueCandidate, TechniqueRecord,
};
use crate::store::KnowledgeStore;

fn pg_err(e: tokio_postgres::Error) -> KbError {
    if e.is_closed() {
        KbError::Connectivity(e.to_string())
    } else {
        KbError::Query(e.to_string())
    }
}

pub struct PgStore {
    cfg: KbConfig,
    client: Client,
}

impl PgStore {
    /// Connects and probes the knowledge base (FAIL-CLOSED on any failure).
    pub async fn connect(cfg: KbConfig) -> Result<Self, KbError> {
        let client = Self::open_client(&cfg).await?;
        Ok(Self { cfg, client })
    }

    async fn open_client(cfg: &KbConfig) -> Result<Client, KbError> {
        let (client, connection) = tokio_postgres::connect(&cfg.connection_string(), NoTls)
            .await
            .map_err(|e| KbError::Connectivity(format!("Database connection failed: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Database connection task error: {}", e);
            }
        });

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| KbError::Connectivity(format!("Connection test query failed: {e}")))?;

        info!("Knowledge base connection established");
        Ok(client)
    }

    /// Apply the authoritative schema SQL file (idempotent DDL).
    /// FAIL-CLOSED if the configured file is missing/unreadable or DDL fails.
    pub async fn apply_schema(&self) -> Result<(), KbError> {
        let path = self.cfg.schema_sql_path.as_ref().ok_or_else(|| {
            KbError::Query(
                "FAIL-CLOSED: schema_sql_path not configured; cannot apply authoritative schema"
                    .to_string(),
            )
        })?;

        let sql = fs::read_to_string(path).map_err(|e| {
            KbError::Query(format!(
                "FAIL-CLOSED: Failed to read authoritative schema file at {}: {}",
                path.display(),
                e
            ))
        })?;

        info!(
            "Applying authoritative knowledge base schema from {} ({} bytes)",
            path.display(),
            sql.len()
        );
        self.client.batch_execute(&sql).await.map_err(pg_err)
    }
}

#[async_trait]
impl KnowledgeStore for PgStore {
    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    async fn reconnect(&mut self) -> Result<(), KbError> {
        self.client = Self::open_client(&self.cfg).await?;
        Ok(())
    }

    async fn find_indicator(&self, value: &str) -> Result<Option<IndicatorRow>, KbError> {
        let row = self
            .client
            .query_opt(
                "SELECT indicator_id, kind, value, description FROM indicators WHERE value = $1",
                &[&value],
            )
            .await
            .map_err(pg_err)?;

        row.map(|r| {
            let label: String = r.get(1);
            let kind = IndicatorKind::from_label(&label).ok_or_else(|| {
                KbError::Query(format!("unrecognized indicator kind label '{label}'"))
            })?;
            Ok(IndicatorRow {
                indicator_id: r.get(0),
                kind,
                value: r.get(2),
                description: r.get(3),
            })
        })
        .transpose()
    }

    async fn adversaries_by_names(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, i64>, KbError> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self
            .client
            .query(
                "SELECT name, adversary_id FROM adversaries WHERE name = ANY($1)",
                &[&names],
            )
            .await
            .map_err(pg_err)?;
        Ok(rows.into_iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    async fn indicators_by_values(
        &self,
        values: &[String],
    ) -> Result<HashMap<String, i64>, KbError> {
        if values.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self
            .client
            .query(
                "SELECT value, indicator_id FROM indicators WHERE value = ANY($1)",
                &[&values],
            )
            .await
            .map_err(pg_err)?;
        Ok(rows.into_iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    async fn insert_adversaries(&mut self, profiles: &[AdversaryProfile]) -> Result<u64, KbError> {
        if profiles.is_empty() {
            return Ok(0);
        }
        let tx = self.client.transaction().await.map_err(pg_err)?;
        let stmt = tx
            .prepare(
                "INSERT INTO adversaries (name, description, aliases) \
                 VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
            )
            .await
            .map_err(pg_err)?;
        let mut created = 0u64;
        for p in profiles {
            created += tx
                .execute(&stmt, &[&p.name, &p.description, &p.aliases])
                .await
                .map_err(pg_err)?;
        }
        tx.commit().await.map_err(pg_err)?;
        Ok(created)
    }

    async fn insert_indicators(
        &mut self,
        candidates: &[IndicatorCandidate],
    ) -> Result<u64, KbError> {
        if candidates.is_empty() {
            return Ok(0);
        }
        let mut kinds: Vec<&str> = Vec::with_capacity(candidates.len());
        let mut values: Vec<&str> = Vec::with_capacity(candidates.len());
        let mut descriptions: Vec<&str> = Vec::with_capacity(candidates.len());
        for c in candidates {
            kinds.push(c.kind.as_str());
            values.push(&c.value);
            descriptions.push(&c.description);
        }

        let tx = self.client.transaction().await.map_err(pg_err)?;
        let created = tx
            .execute(
                "INSERT INTO indicators (kind, value, description) \
                 SELECT k, v, d FROM UNNEST($1::text[], $2::text[], $3::text[]) AS t(k, v, d) \
                 ON CONFLICT (value) DO NOTHING",
                &[&kinds, &values, &descriptions],
            )
            .await
            .map_err(pg_err)?;
        tx.commit().await.map_err(pg_err)?;
        Ok(created)
    }

    async fn insert_events(&mut self, events: &[NewAttributionEvent]) -> Result<u64, KbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let mut descriptions: Vec<&str> = Vec::with_capacity(events.len());
        let mut adversary_ids: Vec<i64> = Vec::with_capacity(events.len());
        let mut indicator_ids: Vec<Option<i64>> = Vec::with_capacity(events.len());
        let mut capability_ids: Vec<Option<i64>> = Vec::with_capacity(events.len());
        let mut technique_ids: Vec<Option<&str>> = Vec::with_capacity(events.len());
        let mut event_times: Vec<DateTime<Utc>> = Vec::with_capacity(events.len());
        let mut scores: Vec<f64> = Vec::with_capacity(events.len());
        for e in events {
            descriptions.push(&e.description);
            adversary_ids.push(e.adversary_id);
            indicator_ids.push(e.indicator_id);
            capability_ids.push(e.capability_id);
            technique_ids.push(e.technique_id.as_deref());
            event_times.push(e.event_time);
            scores.push(e.confidence_score);
        }

        let tx = self.client.transaction().await.map_err(pg_err)?;
        let written = tx
            .execute(
                "INSERT INTO attribution_events \
                 (description, adversary_id, indicator_id, capability_id, technique_id, event_time, confidence_score) \
                 SELECT * FROM UNNEST($1::text[], $2::int8[], $3::int8[], $4::int8[], $5::text[], $6::timestamptz[], $7::float8[])",
                &[
                    &descriptions,
                    &adversary_ids,
                    &indicator_ids,
                    &capability_ids,
                    &technique_ids,
                    &event_times,
                    &scores,
                ],
            )
            .await
            .map_err(pg_err)?;
        tx.commit().await.map_err(pg_err)?;
        Ok(written)
    }

    async fn upsert_techniques(&mut self, records: &[TechniqueRecord]) -> Result<u64, KbError> {
        if records.is_empty() {
            return Ok(0);
        }
        let tx = self.client.transaction().await.map_err(pg_err)?;
        let stmt = tx
            .prepare(
                "INSERT INTO techniques (tid, name, description) VALUES ($1, $2, $3) \
                 ON CONFLICT (tid) DO UPDATE \
                 SET name = EXCLUDED.name, description = EXCLUDED.description",
            )
            .await
            .map_err(pg_err)?;
        let mut written = 0u64;
        for r in records {
            written += tx
                .execute(&stmt, &[&r.tid, &r.name, &r.description])
                .await
                .map_err(pg_err)?;
        }
        tx.commit().await.map_err(pg_err)?;
        Ok(written)
    }

    async fn known_tids(&self, tids: &[String]) -> Result<HashSet<String>, KbError> {
        if tids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = self
            .client
            .query("SELECT tid FROM techniques WHERE tid = ANY($1)", &[&tids])
            .await
            .map_err(pg_err)?;
        Ok(rows.into_iter().map(|r| r.get(0)).collect())
    }

    async fn technique_links(
        &self,
        adversary_ids: &[i64],
    ) -> Result<HashSet<(i64, String)>, KbError> {
        if adversary_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = self
            .client
            .query(
                "SELECT adversary_id, technique_id FROM attribution_events \
                 WHERE adversary_id = ANY($1) AND technique_id IS NOT NULL",
                &[&adversary_ids],
            )
            .await
            .map_err(pg_err)?;
        Ok(rows.into_iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    async fn attribution_links(&self, indicator_id: i64) -> Result<Vec<AttributionLink>, KbError> {
        let rows = self
            .client
            .query(
                "SELECT a.name, e.confidence_score \
                 FROM attribution_events e \
                 JOIN adversaries a ON a.adversary_id = e.adversary_id \
                 WHERE e.indicator_id = $1 \
                 ORDER BY e.event_id",
                &[&indicator_id],
            )
            .await
            .map_err(pg_err)?;
        Ok(rows
            .into_iter()
            .map(|r| AttributionLink {
                adversary: r.get(0),
                confidence_score: r.get(1),
            })
            .collect())
    }

    async fn technique_candidates(
        &self,
        tids: &[String],
    ) -> Result<Vec<TechniqueCandidate>, KbError> {
        if tids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .client
            .query(
                "SELECT a.name, COUNT(DISTINCT e.technique_id)::int8 AS matched \
                 FROM attribution_events e \
                 JOIN adversaries a ON a.adversary_id = e.adversary_id \
                 WHERE e.technique_id = ANY($1) \
                 GROUP BY a.name \
                 ORDER BY matched DESC, a.name ASC",
                &[&tids],
            )
            .await
            .map_err(pg_err)?;
        Ok(rows
            .into_iter()
            .map(|r| TechniqueCandidate {
                adversary: r.get(0),
                matched: r.get(1),
            })
            .collect())
    }

    async fn adversary_inventory(
        &self,
        name: &str,
    ) -> Result<Option<AdversaryInventory>, KbError> {
        let Some(adv) = self
            .client
            .query_opt(
                "SELECT adversary_id, description FROM adversaries WHERE name = $1",
                &[&name],
            )
            .await
            .map_err(pg_err)?
        else {
            return Ok(None);
        };
        let adversary_id: i64 = adv.get(0);

        let indicator_rows = self
            .client
            .query(
                "SELECT DISTINCT i.kind, i.value \
                 FROM indicators i \
                 JOIN attribution_events e ON e.indicator_id = i.indicator_id \
                 WHERE e.adversary_id = $1 \
                 ORDER BY i.kind, i.value",
                &[&adversary_id],
            )
            .await
            .map_err(pg_err)?;

        let mut indicators: std::collections::BTreeMap<String, Vec<String>> = Default::default();
        for r in indicator_rows {
            let kind: String = r.get(0);
            indicators.entry(kind).or_default().push(r.get(1));
        }

        let technique_rows = self
            .client
            .query(
                "SELECT DISTINCT technique_id FROM attribution_events \
                 WHERE adversary_id = $1 AND technique_id IS NOT NULL \
                 ORDER BY technique_id",
                &[&adversary_id],
            )
            .await
            .map_err(pg_err)?;

        Ok(Some(AdversaryInventory {
            name: name.to_string(),
            description: adv.get(1),
            indicators,
            techniques: technique_rows.into_iter().map(|r| r.get(0)).collect(),
        }))
    }

    async fn summary_counts(&self) -> Result<KbSummary, KbError> {
        let adversaries: i64 = self
            .client
            .query_one("SELECT COUNT(*) FROM adversaries", &[])
            .await
            .map_err(pg_err)?
            .get(0);
        let indicators: i64 = self
            .client
            .query_one("SELECT COUNT(*) FROM indicators", &[])
            .await
            .map_err(pg_err)?
            .get(0);
        let events: i64 = self
            .client
            .query_one("SELECT COUNT(*) FROM attribution_events", &[])
            .await
            .map_err(pg_err)?
            .get(0);
        Ok(KbSummary {
            adversaries: adversaries as u64,
            indicators: indicators as u64,
            events: events as u64,
        })
    }
}
