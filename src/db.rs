//! Observation storage.
//!
//! The `RiskStore` trait is the storage seam used by the evaluator: a
//! history read (most recent probability for a place) and an all-or-nothing
//! batch insert. `PgRiskStore` implements it over a blocking PostgreSQL
//! client; `MemoryRiskStore` keeps rows in process for tests and dry runs.
//!
//! The connection is owned by the store and closed when the store is
//! dropped, whichever way the invocation exits. Batch inserts run inside a
//! transaction whose guard rolls back unless it is committed.

use postgres::{Client, NoTls};

use crate::config::DbConfig;
use crate::logging::{self, DataSource};
use crate::model::{PlaceObservation, StoreError};

pub const RISK_TABLE: &str = "precip_risk";

const LATEST_PROBABILITY_SQL: &str = "
    SELECT risk_prob FROM precip_risk
    WHERE place_name = $1
    ORDER BY ts DESC
    LIMIT 1
";

const INSERT_SQL: &str = "
    INSERT INTO precip_risk (
      ts, place_name, precip, precip_inches, hour,
      risk_prob, risk_level, risk_is_elevated_from_previous,
      precip24hr, risk24hr, precip2days, risk2days, precip3days, risk3days,
      expires_at, place_id
    ) VALUES (
      $1, $2, $3, $4, $5,
      $6, $7, $8,
      $9, $10, $11, $12, $13, $14,
      $15, $16
    )
";

// ---------------------------------------------------------------------------
// Storage seam
// ---------------------------------------------------------------------------

pub trait RiskStore {
    /// `risk_prob` of the newest row for `place_name`, if any.
    fn latest_probability(&mut self, place_name: &str) -> Result<Option<f64>, StoreError>;

    /// Inserts every observation or none of them. Returns the row count.
    fn insert_all(&mut self, observations: &[PlaceObservation]) -> Result<usize, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub struct PgRiskStore {
    client: Client,
}

impl PgRiskStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Opens a connection and checks that `precip_risk` exists.
    pub fn connect_and_verify(config: &DbConfig) -> Result<Self, StoreError> {
        let mut store = Self::new(connect(config)?);
        verify_schema(&mut store.client)?;
        Ok(store)
    }

    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }
}

/// Opens a plain connection described by `config`.
pub fn connect(config: &DbConfig) -> Result<Client, StoreError> {
    logging::debug(
        DataSource::Database,
        None,
        &format!("Connecting to {}@{}:{}/{}", config.user, config.host, config.port, config.database),
    );

    postgres::Config::new()
        .host(&config.host)
        .port(config.port)
        .user(&config.user)
        .password(&config.password)
        .dbname(&config.database)
        .connect(NoTls)
        .map_err(StoreError::Connect)
}

/// Fails with `SchemaMissing` if the risk table has not been created.
pub fn verify_schema(client: &mut Client) -> Result<(), StoreError> {
    let row = client.query_one(
        "SELECT EXISTS (
             SELECT 1 FROM information_schema.tables WHERE table_name = $1
         )",
        &[&RISK_TABLE],
    )?;
    schema_status(row.get(0))
}

fn schema_status(table_exists: bool) -> Result<(), StoreError> {
    if table_exists {
        Ok(())
    } else {
        Err(StoreError::SchemaMissing(RISK_TABLE.to_string()))
    }
}

impl RiskStore for PgRiskStore {
    fn latest_probability(&mut self, place_name: &str) -> Result<Option<f64>, StoreError> {
        let row = self.client.query_opt(LATEST_PROBABILITY_SQL, &[&place_name])?;
        Ok(row.map(|r| r.get::<_, f64>(0)))
    }

    fn insert_all(&mut self, observations: &[PlaceObservation]) -> Result<usize, StoreError> {
        let mut tx = self.client.transaction()?;

        for obs in observations {
            let risk_level = obs.risk_level.as_i16();
            let risk24hr = obs.extended.day.risk_level.as_i16();
            let risk2days = obs.extended.two_days.risk_level.as_i16();
            let risk3days = obs.extended.three_days.risk_level.as_i16();

            tx.execute(
                INSERT_SQL,
                &[
                    &obs.timestamp,
                    &obs.place_name,
                    &obs.rainfall_mm,
                    &obs.rainfall_inches,
                    &obs.hour,
                    &obs.probability,
                    &risk_level,
                    &obs.risk_elevated,
                    &obs.extended.day.rainfall_mm,
                    &risk24hr,
                    &obs.extended.two_days.rainfall_mm,
                    &risk2days,
                    &obs.extended.three_days.rainfall_mm,
                    &risk3days,
                    &obs.expires_at,
                    &obs.place_id,
                ],
            )?;
        }

        tx.commit()?;
        Ok(observations.len())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local store with the same read and write semantics as the table.
#[derive(Debug, Default)]
pub struct MemoryRiskStore {
    rows: Vec<PlaceObservation>,
    reject_place: Option<String>,
}

impl MemoryRiskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `rows`, as if written by earlier runs.
    pub fn with_rows(rows: Vec<PlaceObservation>) -> Self {
        Self { rows, reject_place: None }
    }

    /// Makes every batch containing `place_name` fail.
    pub fn rejecting(mut self, place_name: &str) -> Self {
        self.reject_place = Some(place_name.to_string());
        self
    }

    pub fn rows(&self) -> &[PlaceObservation] {
        &self.rows
    }
}

impl RiskStore for MemoryRiskStore {
    fn latest_probability(&mut self, place_name: &str) -> Result<Option<f64>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.place_name == place_name)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
            .map(|r| r.probability))
    }

    fn insert_all(&mut self, observations: &[PlaceObservation]) -> Result<usize, StoreError> {
        if let Some(rejected) = &self.reject_place {
            if let Some(obs) = observations.iter().find(|o| &o.place_name == rejected) {
                return Err(StoreError::Rejected {
                    place: obs.place_name.clone(),
                    reason: "write refused".to_string(),
                });
            }
        }
        self.rows.extend_from_slice(observations);
        Ok(observations.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
