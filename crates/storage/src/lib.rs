mod seed;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use skybot_core::{ChatTurn, FlightRecord};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

pub use seed::sample_flights;

/// A flight document as the store holds it. `doc_id` is store-internal and
/// never leaves this crate's callers through [`StoredFlight::into_record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFlight {
    pub doc_id: String,
    pub record: FlightRecord,
}

impl StoredFlight {
    pub fn new(record: FlightRecord) -> Self {
        Self {
            doc_id: Uuid::new_v4().to_string(),
            record,
        }
    }

    pub fn into_record(self) -> FlightRecord {
        self.record
    }
}

pub trait FlightRepository: Send + Sync {
    /// Exact match on `flight_number`; the earliest inserted document wins.
    async fn find_flight(&self, flight_number: &str) -> Result<Option<StoredFlight>>;
    /// Appends every record as a new document and returns the new ids.
    async fn insert_flights(&self, records: &[FlightRecord]) -> Result<Vec<String>>;
}

pub trait ChatHistoryRepository: Send + Sync {
    async fn append_turn(&self, turn: &ChatTurn) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    flights: Arc<RwLock<Vec<StoredFlight>>>,
    history: Arc<RwLock<Vec<ChatTurn>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flight_len(&self) -> usize {
        self.flights.read().len()
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl FlightRepository for MemoryStore {
    async fn find_flight(&self, flight_number: &str) -> Result<Option<StoredFlight>> {
        Ok(self
            .flights
            .read()
            .iter()
            .find(|doc| doc.record.flight_number == flight_number)
            .cloned())
    }

    async fn insert_flights(&self, records: &[FlightRecord]) -> Result<Vec<String>> {
        let docs = records
            .iter()
            .cloned()
            .map(StoredFlight::new)
            .collect::<Vec<_>>();
        let ids = docs.iter().map(|doc| doc.doc_id.clone()).collect();
        self.flights.write().extend(docs);
        Ok(ids)
    }
}

impl ChatHistoryRepository for MemoryStore {
    async fn append_turn(&self, turn: &ChatTurn) -> Result<()> {
        self.history.write().push(turn.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the pool once; every lookup afterwards reuses it.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url {}", database_url))?
            .create_if_missing(true);

        // An in-memory database lives and dies with its connection.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!(database_url = %database_url, "flight store connected");
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS flights (
              doc_id TEXT PRIMARY KEY,
              flight_number TEXT NOT NULL,
              departure_time TEXT NOT NULL,
              destination TEXT NOT NULL,
              status TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_flights_flight_number ON flights (flight_number)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_history (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              session_id TEXT NOT NULL,
              role TEXT NOT NULL,
              content TEXT NOT NULL,
              at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl FlightRepository for SqliteStore {
    async fn find_flight(&self, flight_number: &str) -> Result<Option<StoredFlight>> {
        let row = sqlx::query(
            r#"
            SELECT doc_id, flight_number, departure_time, destination, status
            FROM flights
            WHERE flight_number = ?1
            ORDER BY rowid
            LIMIT 1
            "#,
        )
        .bind(flight_number)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(StoredFlight {
            doc_id: row.get("doc_id"),
            record: FlightRecord {
                flight_number: row.get("flight_number"),
                departure_time: row.get("departure_time"),
                destination: row.get("destination"),
                status: row.get("status"),
            },
        }))
    }

    async fn insert_flights(&self, records: &[FlightRecord]) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(records.len());

        for record in records {
            let doc = StoredFlight::new(record.clone());
            sqlx::query(
                r#"
                INSERT INTO flights (doc_id, flight_number, departure_time, destination, status)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&doc.doc_id)
            .bind(&doc.record.flight_number)
            .bind(&doc.record.departure_time)
            .bind(&doc.record.destination)
            .bind(&doc.record.status)
            .execute(&mut *tx)
            .await?;
            ids.push(doc.doc_id);
        }

        tx.commit().await?;
        Ok(ids)
    }
}

impl ChatHistoryRepository for SqliteStore {
    async fn append_turn(&self, turn: &ChatTurn) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_history (session_id, role, content, at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&turn.session_id)
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(turn.at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// In-memory store preloaded with [`sample_flights`].
    pub async fn seeded_memory() -> Result<Self> {
        let store = MemoryStore::new();
        store.insert_flights(&sample_flights()).await?;
        Ok(Self::Memory(store))
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }

    pub async fn close(&self) {
        if let Store::Sqlite(store) = self {
            store.close().await;
        }
    }
}

impl FlightRepository for Store {
    async fn find_flight(&self, flight_number: &str) -> Result<Option<StoredFlight>> {
        match self {
            Store::Memory(store) => store.find_flight(flight_number).await,
            Store::Sqlite(store) => store.find_flight(flight_number).await,
        }
    }

    async fn insert_flights(&self, records: &[FlightRecord]) -> Result<Vec<String>> {
        match self {
            Store::Memory(store) => store.insert_flights(records).await,
            Store::Sqlite(store) => store.insert_flights(records).await,
        }
    }
}

impl ChatHistoryRepository for Store {
    async fn append_turn(&self, turn: &ChatTurn) -> Result<()> {
        match self {
            Store::Memory(store) => store.append_turn(turn).await,
            Store::Sqlite(store) => store.append_turn(turn).await,
        }
    }
}
