//! Lifecycle registry and expiry event scheduler
//!
//! Tracks each agreement's canonical state in SQLite and keeps a
//! deduplicated schedule of expiry notifications in step with it. Upsert is
//! idempotent: the whole read-modify-write runs in one transaction, and
//! repeating identical input never duplicates records or events.

mod store;

pub use store::SCHEMA_SQL;

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle states of a tracked agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Created,
    Draft,
    InReview,
    PendingSignature,
    CustomerSigned,
    Reviewed,
    Approved,
    Rejected,
    Signed,
    Active,
    Expired,
    Terminated,
    Archived,
}

impl RecordStatus {
    /// Whether a transition to `next` is allowed. `archived` is terminal
    /// and reachable from any state.
    pub fn can_transition(self, next: RecordStatus) -> bool {
        use RecordStatus::*;

        match (self, next) {
            (Archived, _) => false,
            (_, Archived) => true,
            (Created, Draft) | (Created, InReview) => true,
            (Draft, InReview) => true,
            (InReview, PendingSignature) | (InReview, Reviewed) | (InReview, Rejected) => true,
            (PendingSignature, CustomerSigned) | (PendingSignature, Rejected) => true,
            (CustomerSigned, Reviewed) => true,
            (Reviewed, Approved) | (Reviewed, Rejected) => true,
            (Approved, Signed) => true,
            (Rejected, Draft) => true,
            (Signed, Active) | (Signed, Expired) => true,
            (Active, Expired) | (Active, Terminated) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordStatus::Created => "created",
            RecordStatus::Draft => "draft",
            RecordStatus::InReview => "in_review",
            RecordStatus::PendingSignature => "pending_signature",
            RecordStatus::CustomerSigned => "customer_signed",
            RecordStatus::Reviewed => "reviewed",
            RecordStatus::Approved => "approved",
            RecordStatus::Rejected => "rejected",
            RecordStatus::Signed => "signed",
            RecordStatus::Active => "active",
            RecordStatus::Expired => "expired",
            RecordStatus::Terminated => "terminated",
            RecordStatus::Archived => "archived",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RecordStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "created" => Ok(RecordStatus::Created),
            "draft" => Ok(RecordStatus::Draft),
            "in_review" => Ok(RecordStatus::InReview),
            "pending_signature" => Ok(RecordStatus::PendingSignature),
            "customer_signed" => Ok(RecordStatus::CustomerSigned),
            "reviewed" => Ok(RecordStatus::Reviewed),
            "approved" => Ok(RecordStatus::Approved),
            "rejected" => Ok(RecordStatus::Rejected),
            "signed" => Ok(RecordStatus::Signed),
            "active" => Ok(RecordStatus::Active),
            "expired" => Ok(RecordStatus::Expired),
            "terminated" => Ok(RecordStatus::Terminated),
            "archived" => Ok(RecordStatus::Archived),
            _ => Err(Error::Other(format!("Unknown record status: {}", s))),
        }
    }
}

/// Expiry notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Expiring90d,
    Expiring60d,
    Expiring30d,
    Expired,
}

impl EventKind {
    /// Days before expiry this reminder fires; zero for the expiry itself
    fn days_before(self) -> i64 {
        match self {
            EventKind::Expiring90d => 90,
            EventKind::Expiring60d => 60,
            EventKind::Expiring30d => 30,
            EventKind::Expired => 0,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Expiring90d => "expiring_90d",
            EventKind::Expiring60d => "expiring_60d",
            EventKind::Expiring30d => "expiring_30d",
            EventKind::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "expiring_90d" => Ok(EventKind::Expiring90d),
            "expiring_60d" => Ok(EventKind::Expiring60d),
            "expiring_30d" => Ok(EventKind::Expiring30d),
            "expired" => Ok(EventKind::Expired),
            _ => Err(Error::Other(format!("Unknown event kind: {}", s))),
        }
    }
}

/// Canonical record for one tracked agreement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub id: String,
    pub document_id: Option<String>,
    pub content_hash: String,
    pub counterparty: String,
    pub status: RecordStatus,
    pub effective_date: Option<NaiveDate>,
    pub term_months: Option<u32>,
    /// `effective_date + term_months`, null unless both are present
    pub expiry_date: Option<NaiveDate>,
    pub owner: Option<String>,
    pub file_uri: Option<String>,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A scheduled expiry notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: String,
    pub record_id: String,
    pub kind: EventKind,
    pub scheduled_for: DateTime<Utc>,
    pub delivered_at: Option<String>,
    pub payload_json: String,
}

/// Input to an upsert. Identity resolves by `document_id` when present,
/// else by `content_hash`.
#[derive(Debug, Clone)]
pub struct UpsertFields {
    pub document_id: Option<String>,
    pub content_hash: String,
    pub counterparty: String,
    pub status: RecordStatus,
    pub effective_date: Option<NaiveDate>,
    pub term_months: Option<u32>,
    pub owner: Option<String>,
    pub file_uri: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, FromRow)]
struct RecordRow {
    id: String,
    document_id: Option<String>,
    content_hash: String,
    counterparty: String,
    status: String,
    effective_date: Option<String>,
    term_months: Option<i64>,
    expiry_date: Option<String>,
    owner: Option<String>,
    file_uri: Option<String>,
    tags_json: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RecordRow {
    fn into_record(self) -> Result<RegistryRecord> {
        Ok(RegistryRecord {
            id: self.id,
            document_id: self.document_id,
            content_hash: self.content_hash,
            counterparty: self.counterparty,
            status: self.status.parse()?,
            effective_date: parse_date_opt(self.effective_date.as_deref())?,
            term_months: self.term_months.map(|m| m as u32),
            expiry_date: parse_date_opt(self.expiry_date.as_deref())?,
            owner: self.owner,
            file_uri: self.file_uri,
            tags: self
                .tags_json
                .as_deref()
                .and_then(|j| serde_json::from_str(j).ok())
                .unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    id: String,
    record_id: String,
    kind: String,
    scheduled_for: String,
    delivered_at: Option<String>,
    payload_json: String,
}

impl EventRow {
    fn into_event(self) -> Result<LifecycleEvent> {
        let scheduled_for = DateTime::parse_from_rfc3339(&self.scheduled_for)
            .map_err(|e| Error::Other(format!("Bad event timestamp: {}", e)))?
            .with_timezone(&Utc);
        Ok(LifecycleEvent {
            id: self.id,
            record_id: self.record_id,
            kind: self.kind.parse()?,
            scheduled_for,
            delivered_at: self.delivered_at,
            payload_json: self.payload_json,
        })
    }
}

fn parse_date_opt(s: Option<&str>) -> Result<Option<NaiveDate>> {
    match s {
        None => Ok(None),
        Some(s) => s
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|e| Error::Other(format!("Bad stored date '{}': {}", s, e))),
    }
}

fn compute_expiry(effective: Option<NaiveDate>, term_months: Option<u32>) -> Option<NaiveDate> {
    match (effective, term_months) {
        (Some(date), Some(months)) => date.checked_add_months(Months::new(months)),
        _ => None,
    }
}

/// Timestamps dedup at second precision; format accordingly
fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Registry database handle
#[derive(Clone)]
pub struct Registry {
    pool: SqlitePool,
}

impl Registry {
    /// Open (and initialize if needed) the registry database
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to registry database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let registry = Self { pool };
        registry.init_schema().await?;
        Ok(registry)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Create or update a record and reconcile its pending events, as one
    /// transaction. Repeating identical input yields the same record id and
    /// the same pending-event set.
    pub async fn upsert(&self, fields: UpsertFields) -> Result<RegistryRecord> {
        let mut tx = self.pool.begin().await?;

        let existing = Self::resolve_identity(&mut tx, &fields).await?;

        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let expiry = compute_expiry(fields.effective_date, fields.term_months);

        // A signed record whose expiry has already passed is stored expired
        let requested = fields.status;
        let status = if requested == RecordStatus::Signed
            && expiry.is_some_and(|d| d < now.date_naive())
        {
            info!("Record expiry already past, coercing signed to expired");
            RecordStatus::Expired
        } else {
            requested
        };

        let tags_json = serde_json::to_string(&fields.tags)?;
        let (id, created_at) = match &existing {
            Some(row) => (row.id.clone(), row.created_at.clone()),
            None => (Uuid::new_v4().to_string(), now_str.clone()),
        };

        sqlx::query(
            r#"
            INSERT INTO records (id, document_id, content_hash, counterparty, status,
                effective_date, term_months, expiry_date, owner, file_uri, tags_json,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                document_id = excluded.document_id,
                content_hash = excluded.content_hash,
                counterparty = excluded.counterparty,
                status = excluded.status,
                effective_date = excluded.effective_date,
                term_months = excluded.term_months,
                expiry_date = excluded.expiry_date,
                owner = excluded.owner,
                file_uri = excluded.file_uri,
                tags_json = excluded.tags_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(&fields.document_id)
        .bind(&fields.content_hash)
        .bind(&fields.counterparty)
        .bind(status.to_string())
        .bind(fields.effective_date.map(|d| d.to_string()))
        .bind(fields.term_months.map(|m| m as i64))
        .bind(expiry.map(|d| d.to_string()))
        .bind(&fields.owner)
        .bind(&fields.file_uri)
        .bind(&tags_json)
        .bind(&created_at)
        .bind(&now_str)
        .execute(&mut *tx)
        .await?;

        // The notification schedule keys off the requested signed status:
        // coercion to expired keeps the expiry event alive.
        if requested == RecordStatus::Signed && expiry.is_some() {
            let expiry = expiry.ok_or_else(|| Error::Other("expiry vanished".into()))?;
            Self::reconcile_events(&mut tx, &id, &fields, expiry, now).await?;
        } else {
            sqlx::query(
                "DELETE FROM lifecycle_events WHERE record_id = ? AND delivered_at IS NULL",
            )
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get(&id)
            .await?
            .ok_or_else(|| Error::RecordNotFound(id))
    }

    async fn resolve_identity(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        fields: &UpsertFields,
    ) -> Result<Option<RecordRow>> {
        // Most-recently-updated match wins when several records share an
        // identity key
        let row = if let Some(document_id) = &fields.document_id {
            sqlx::query_as::<_, RecordRow>(
                "SELECT * FROM records WHERE document_id = ? ORDER BY updated_at DESC LIMIT 1",
            )
            .bind(document_id)
            .fetch_optional(&mut **tx)
            .await?
        } else {
            sqlx::query_as::<_, RecordRow>(
                "SELECT * FROM records WHERE content_hash = ? ORDER BY updated_at DESC LIMIT 1",
            )
            .bind(&fields.content_hash)
            .fetch_optional(&mut **tx)
            .await?
        };
        Ok(row)
    }

    async fn reconcile_events(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        record_id: &str,
        fields: &UpsertFields,
        expiry: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let expiry_instant = expiry.and_time(NaiveTime::MIN).and_utc();

        // Reminders only if still future; the expired event regardless
        let mut candidates: Vec<(EventKind, String)> = Vec::new();
        for kind in [
            EventKind::Expiring90d,
            EventKind::Expiring60d,
            EventKind::Expiring30d,
        ] {
            let scheduled = expiry_instant - Duration::days(kind.days_before());
            if scheduled > now {
                candidates.push((kind, format_instant(scheduled)));
            }
        }
        candidates.push((EventKind::Expired, format_instant(expiry_instant)));

        let existing: Vec<(String, String)> = sqlx::query_as(
            "SELECT kind, scheduled_for FROM lifecycle_events
             WHERE record_id = ? AND delivered_at IS NULL",
        )
        .bind(record_id)
        .fetch_all(&mut **tx)
        .await?;

        // Drop undelivered events no longer matching any candidate (expiry
        // moved, reminder window passed)
        for (kind, scheduled_for) in &existing {
            if !candidates
                .iter()
                .any(|(k, s)| k.to_string() == *kind && s == scheduled_for)
            {
                sqlx::query(
                    "DELETE FROM lifecycle_events
                     WHERE record_id = ? AND kind = ? AND scheduled_for = ?
                       AND delivered_at IS NULL",
                )
                .bind(record_id)
                .bind(kind)
                .bind(scheduled_for)
                .execute(&mut **tx)
                .await?;
            }
        }

        let payload = serde_json::json!({
            "record_id": record_id,
            "counterparty": fields.counterparty,
            "expiry_date": expiry.to_string(),
            "owner": fields.owner,
            "file_uri": fields.file_uri,
        })
        .to_string();

        for (kind, scheduled_for) in candidates {
            let already = existing
                .iter()
                .any(|(k, s)| *k == kind.to_string() && *s == scheduled_for);
            if already {
                continue;
            }

            debug!("Scheduling {} event at {}", kind, scheduled_for);
            sqlx::query(
                r#"
                INSERT INTO lifecycle_events (id, record_id, kind, scheduled_for,
                    delivered_at, payload_json, created_at)
                VALUES (?, ?, ?, ?, NULL, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(record_id)
            .bind(kind.to_string())
            .bind(&scheduled_for)
            .bind(&payload)
            .bind(now.to_rfc3339())
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Get a record by id
    pub async fn get(&self, record_id: &str) -> Result<Option<RegistryRecord>> {
        let row = sqlx::query_as::<_, RecordRow>("SELECT * FROM records WHERE id = ?")
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(RecordRow::into_record).transpose()
    }

    /// Get the most recently updated record for a document
    pub async fn find_by_document(&self, document_id: &str) -> Result<Option<RegistryRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT * FROM records WHERE document_id = ? ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(RecordRow::into_record).transpose()
    }

    /// List records, optionally restricted to one status
    pub async fn list(&self, status: Option<RecordStatus>) -> Result<Vec<RegistryRecord>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, RecordRow>(
                    "SELECT * FROM records WHERE status = ? ORDER BY updated_at DESC",
                )
                .bind(status.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RecordRow>("SELECT * FROM records ORDER BY updated_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(RecordRow::into_record).collect()
    }

    /// Undelivered events, soonest first
    pub async fn pending_events(&self) -> Result<Vec<LifecycleEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT * FROM lifecycle_events WHERE delivered_at IS NULL
             ORDER BY scheduled_for ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(EventRow::into_event).collect()
    }

    /// Mark an event delivered. The only mutation of delivery state.
    pub async fn mark_delivered(&self, event_id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE lifecycle_events SET delivered_at = ? WHERE id = ? AND delivered_at IS NULL",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::EventNotFound(event_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (Registry, TempDir) {
        let tmp = TempDir::new().unwrap();
        let registry = Registry::open(&tmp.path().join("registry.db")).await.unwrap();
        (registry, tmp)
    }

    fn signed_fields(effective: NaiveDate, term_months: u32) -> UpsertFields {
        UpsertFields {
            document_id: Some("doc-1".to_string()),
            content_hash: "hash-1".to_string(),
            counterparty: "Beta Corp".to_string(),
            status: RecordStatus::Signed,
            effective_date: Some(effective),
            term_months: Some(term_months),
            owner: Some("legal@acme.example".to_string()),
            file_uri: Some("file:///nda.pdf".to_string()),
            tags: vec!["nda".to_string()],
        }
    }

    #[tokio::test]
    async fn test_expiry_is_effective_plus_term() {
        let (registry, _tmp) = setup().await;
        let effective = Utc::now().date_naive();

        let record = registry.upsert(signed_fields(effective, 36)).await.unwrap();

        assert_eq!(
            record.expiry_date,
            effective.checked_add_months(Months::new(36))
        );
        assert_eq!(record.status, RecordStatus::Signed);

        // Full reminder ladder plus the expiry event itself
        let events = registry.pending_events().await.unwrap();
        assert_eq!(events.len(), 4);
        for pair in events.windows(2) {
            assert!(pair[0].scheduled_for <= pair[1].scheduled_for);
        }
        assert_eq!(events[3].kind, EventKind::Expired);
        assert!(events[0].payload_json.contains("Beta Corp"));
    }

    #[tokio::test]
    async fn test_expiry_null_when_term_missing() {
        let (registry, _tmp) = setup().await;
        let mut fields = signed_fields(Utc::now().date_naive(), 36);
        fields.term_months = None;

        let record = registry.upsert(fields).await.unwrap();
        assert!(record.expiry_date.is_none());
        assert!(registry.pending_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (registry, _tmp) = setup().await;
        let effective = Utc::now().date_naive();

        let first = registry.upsert(signed_fields(effective, 36)).await.unwrap();
        let events_before = registry.pending_events().await.unwrap();

        let second = registry.upsert(signed_fields(effective, 36)).await.unwrap();
        let events_after = registry.pending_events().await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(registry.list(None).await.unwrap().len(), 1);
        assert_eq!(events_before.len(), events_after.len());
        let ids_before: Vec<_> = events_before.iter().map(|e| &e.id).collect();
        let ids_after: Vec<_> = events_after.iter().map(|e| &e.id).collect();
        assert_eq!(ids_before, ids_after);
    }

    #[tokio::test]
    async fn test_signed_past_expiry_coerced_to_expired() {
        let (registry, _tmp) = setup().await;
        let effective = Utc::now()
            .date_naive()
            .checked_sub_months(Months::new(36))
            .unwrap();

        let record = registry.upsert(signed_fields(effective, 24)).await.unwrap();
        assert_eq!(record.status, RecordStatus::Expired);

        // Reminders are all in the past and excluded; the expired event is
        // still created at the (past) expiry instant.
        let events = registry.pending_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Expired);
        assert!(events[0].scheduled_for < Utc::now());
    }

    #[tokio::test]
    async fn test_identity_by_content_hash() {
        let (registry, _tmp) = setup().await;
        let effective = Utc::now().date_naive();

        let mut fields = signed_fields(effective, 36);
        fields.document_id = None;
        let first = registry.upsert(fields.clone()).await.unwrap();

        fields.counterparty = "Beta Corporation".to_string();
        let second = registry.upsert(fields).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.counterparty, "Beta Corporation");
    }

    #[tokio::test]
    async fn test_leaving_signed_clears_pending_events() {
        let (registry, _tmp) = setup().await;
        let effective = Utc::now().date_naive();

        registry.upsert(signed_fields(effective, 36)).await.unwrap();
        assert_eq!(registry.pending_events().await.unwrap().len(), 4);

        let mut fields = signed_fields(effective, 36);
        fields.status = RecordStatus::Terminated;
        let record = registry.upsert(fields).await.unwrap();

        assert_eq!(record.status, RecordStatus::Terminated);
        assert!(registry.pending_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_changed_expiry_reschedules_events() {
        let (registry, _tmp) = setup().await;
        let effective = Utc::now().date_naive();

        registry.upsert(signed_fields(effective, 36)).await.unwrap();
        registry.upsert(signed_fields(effective, 48)).await.unwrap();

        let events = registry.pending_events().await.unwrap();
        assert_eq!(events.len(), 4);

        let expiry = effective.checked_add_months(Months::new(48)).unwrap();
        let expired = events.iter().find(|e| e.kind == EventKind::Expired).unwrap();
        assert_eq!(expired.scheduled_for.date_naive(), expiry);
    }

    #[tokio::test]
    async fn test_mark_delivered() {
        let (registry, _tmp) = setup().await;
        registry
            .upsert(signed_fields(Utc::now().date_naive(), 36))
            .await
            .unwrap();

        let events = registry.pending_events().await.unwrap();
        let first_id = events[0].id.clone();

        registry.mark_delivered(&first_id).await.unwrap();
        let remaining = registry.pending_events().await.unwrap();
        assert_eq!(remaining.len(), events.len() - 1);
        assert!(remaining.iter().all(|e| e.id != first_id));

        // Delivery is one-shot
        assert!(registry.mark_delivered(&first_id).await.is_err());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (registry, _tmp) = setup().await;
        let effective = Utc::now().date_naive();

        registry.upsert(signed_fields(effective, 36)).await.unwrap();
        let mut draft = signed_fields(effective, 36);
        draft.document_id = Some("doc-2".to_string());
        draft.content_hash = "hash-2".to_string();
        draft.status = RecordStatus::Draft;
        registry.upsert(draft).await.unwrap();

        assert_eq!(registry.list(None).await.unwrap().len(), 2);
        let signed = registry.list(Some(RecordStatus::Signed)).await.unwrap();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].document_id.as_deref(), Some("doc-1"));
    }

    #[test]
    fn test_status_transitions() {
        use RecordStatus::*;

        assert!(Signed.can_transition(Active));
        assert!(Active.can_transition(Expired));
        assert!(Active.can_transition(Terminated));
        assert!(Draft.can_transition(Archived));
        assert!(Expired.can_transition(Archived));
        assert!(!Archived.can_transition(Draft));
        assert!(!Active.can_transition(Draft));
        assert!(!Expired.can_transition(Active));
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            "created",
            "in_review",
            "pending_signature",
            "customer_signed",
            "signed",
            "archived",
        ] {
            let parsed: RecordStatus = status.parse().unwrap();
            assert_eq!(parsed.to_string(), status);
        }
        assert!("bogus".parse::<RecordStatus>().is_err());
    }
}
