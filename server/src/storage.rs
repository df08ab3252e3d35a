use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use common::query::{IncidentQuery, Sort, SortField, SortOrder};
use common::validation::{check_new, check_patch};
use common::{Incident, IncidentPatch, NewIncident, OpenCounts, Page, PageMeta, Severity, Status};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

const COLUMNS: &str = "id, title, service, severity, status, owner, summary, created_at, updated_at";

const INSERT_COLUMNS: &str =
    "id, title, service, severity, status, owner, summary, created_at, updated_at, title_key, service_key, owner_key";

/// Rows per multi-row INSERT, well under SQLite's bound-parameter limit.
const INSERT_CHUNK: usize = 100;

#[derive(Clone)]
pub struct Storage { pool: SqlitePool }

#[derive(Debug, FromRow)]
struct IncidentRow {
    id: String,
    title: String,
    service: String,
    severity: String,
    status: String,
    owner: Option<String>,
    summary: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<IncidentRow> for Incident {
    type Error = StoreError;

    fn try_from(row: IncidentRow) -> StoreResult<Self> {
        let severity = Severity::from_str(&row.severity).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let status = Status::from_str(&row.status).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Incident {
            id: row.id,
            title: row.title,
            service: row.service,
            severity,
            status,
            owner: row.owner,
            summary: row.summary,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

impl Storage {
    pub async fn new(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
        // Every connection to :memory: is a separate database, so keep exactly one alive.
        if database_url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    pub async fn in_memory() -> StoreResult<Self> {
        Self::new("sqlite::memory:", 1).await
    }

    /// Wraps an existing pool, applying the schema.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        pool.execute(SCHEMA).await?;
        Ok(Self { pool })
    }

    pub async fn create(&self, new: NewIncident) -> StoreResult<Incident> {
        check_new(&new)?;
        let now = now_millis();
        let incident = Incident {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            service: new.service,
            severity: new.severity,
            status: new.status,
            owner: new.owner,
            summary: new.summary,
            created_at: from_millis(now)?,
            updated_at: from_millis(now)?,
        };

        sqlx::query(&format!(
            "INSERT INTO incidents({INSERT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&incident.id)
        .bind(&incident.title)
        .bind(&incident.service)
        .bind(incident.severity.as_str())
        .bind(incident.status.as_str())
        .bind(&incident.owner)
        .bind(&incident.summary)
        .bind(now)
        .bind(now)
        .bind(fold(&incident.title))
        .bind(fold(&incident.service))
        .bind(incident.owner.as_deref().map(fold))
        .execute(&self.pool)
        .await?;

        Ok(incident)
    }

    pub async fn list(&self, query: &IncidentQuery) -> StoreResult<Page<Incident>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM incidents");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM incidents"));
        push_filters(&mut select, query);
        select.push(" ORDER BY ").push(order_clause(query.sort));
        select
            .push(" LIMIT ")
            .push_bind(query.pagination.limit as i64)
            .push(" OFFSET ")
            .push_bind(query.pagination.offset() as i64);

        let rows = select.build_query_as::<IncidentRow>().fetch_all(&self.pool).await?;
        let data = rows
            .into_iter()
            .map(Incident::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Page {
            data,
            meta: PageMeta::new(query.pagination.page, query.pagination.limit, total.max(0) as u64),
        })
    }

    pub async fn get_by_id(&self, id: &str) -> StoreResult<Incident> {
        let row = sqlx::query_as::<_, IncidentRow>(&format!("SELECT {COLUMNS} FROM incidents WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Writes only the fields present in `patch` and bumps `updated_at`.
    pub async fn update(&self, id: &str, patch: &IncidentPatch) -> StoreResult<Incident> {
        check_patch(patch)?;

        let mut update = QueryBuilder::<Sqlite>::new("UPDATE incidents SET updated_at = MAX(");
        update.push_bind(now_millis()).push(", created_at)");
        if let Some(ref title) = patch.title {
            update.push(", title = ").push_bind(title.clone());
            update.push(", title_key = ").push_bind(fold(title));
        }
        if let Some(ref service) = patch.service {
            update.push(", service = ").push_bind(service.clone());
            update.push(", service_key = ").push_bind(fold(service));
        }
        if let Some(severity) = patch.severity {
            update.push(", severity = ").push_bind(severity.as_str());
        }
        if let Some(status) = patch.status {
            update.push(", status = ").push_bind(status.as_str());
        }
        if let Some(ref owner) = patch.owner {
            update.push(", owner = ").push_bind(owner.clone());
            update.push(", owner_key = ").push_bind(owner.as_deref().map(fold));
        }
        if let Some(ref summary) = patch.summary {
            update.push(", summary = ").push_bind(summary.clone());
        }
        update.push(" WHERE id = ").push_bind(id.to_string());
        update.push(" RETURNING ").push(COLUMNS);

        let row = update.build_query_as::<IncidentRow>().fetch_optional(&self.pool).await?;
        match row {
            Some(row) => row.try_into(),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Hard delete. Returns the record as it was.
    pub async fn remove(&self, id: &str) -> StoreResult<Incident> {
        let row = sqlx::query_as::<_, IncidentRow>(&format!("DELETE FROM incidents WHERE id = ? RETURNING {COLUMNS}"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    pub async fn open_counts(&self) -> StoreResult<OpenCounts> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT severity, COUNT(*) FROM incidents WHERE status = 'OPEN' GROUP BY severity",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = OpenCounts::default();
        for (severity, count) in rows {
            let severity = Severity::from_str(&severity).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            counts.set(severity, count.max(0) as u64);
        }
        Ok(counts)
    }

    /// Deletes every record and inserts `incidents` in one transaction.
    pub async fn replace_all(&self, incidents: &[Incident]) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM incidents").execute(&mut *tx).await?;

        let mut inserted = 0;
        for chunk in incidents.chunks(INSERT_CHUNK) {
            let mut insert = QueryBuilder::<Sqlite>::new(format!("INSERT INTO incidents({INSERT_COLUMNS}) "));
            insert.push_values(chunk, |mut row, incident| {
                row.push_bind(incident.id.clone())
                    .push_bind(incident.title.clone())
                    .push_bind(incident.service.clone())
                    .push_bind(incident.severity.as_str())
                    .push_bind(incident.status.as_str())
                    .push_bind(incident.owner.clone())
                    .push_bind(incident.summary.clone())
                    .push_bind(incident.created_at.timestamp_millis())
                    .push_bind(incident.updated_at.timestamp_millis())
                    .push_bind(fold(&incident.title))
                    .push_bind(fold(&incident.service))
                    .push_bind(incident.owner.as_deref().map(fold));
            });
            inserted += insert.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn count(&self) -> StoreResult<u64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM incidents")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.0.max(0) as u64)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &IncidentQuery) {
    let mut joiner = " WHERE ";

    if let Some(ref search) = query.search {
        let pattern = like_pattern(&fold(search));
        builder
            .push(joiner)
            .push("(title_key LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR service_key LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR owner_key LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
        joiner = " AND ";
    }
    if let Some(severity) = query.severity {
        builder.push(joiner).push("severity = ").push_bind(severity.as_str());
        joiner = " AND ";
    }
    if let Some(status) = query.status {
        builder.push(joiner).push("status = ").push_bind(status.as_str());
        joiner = " AND ";
    }
    if let Some(ref service) = query.service {
        builder
            .push(joiner)
            .push("service_key LIKE ")
            .push_bind(like_pattern(&fold(service)))
            .push(" ESCAPE '\\'");
    }
}

/// Case folding for the `*_key` columns and search needles. SQLite's own
/// LIKE only folds ASCII.
fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Substring pattern for LIKE with the wildcards in `needle` escaped.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// ORDER BY body. `id` breaks ties so pages don't overlap.
fn order_clause(sort: Sort) -> String {
    let column = match sort.field {
        SortField::Id => "id",
        SortField::Title => "title",
        SortField::Service => "service",
        SortField::Severity => "severity",
        SortField::Status => "CASE status WHEN 'OPEN' THEN 0 WHEN 'MITIGATED' THEN 1 ELSE 2 END",
        SortField::Owner => "owner",
        SortField::Summary => "summary",
        SortField::CreatedAt => "created_at",
        SortField::UpdatedAt => "updated_at",
    };
    let direction = match sort.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    if sort.field == SortField::Id {
        format!("id {direction}")
    } else {
        format!("{column} {direction}, id {direction}")
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn from_millis(ms: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Database(sqlx::Error::Decode(format!("timestamp {ms} out of range").into())))
}
