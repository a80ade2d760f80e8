use crate::{
    error::RepositoryError,
    models::{
        DashboardStats, NewStatusEntry, Officer, PropertyRecord, Rack, Station, StatusLogEntry,
        StorageBox, SubmitPropertyRequest, UpdateOfficerRequest, UpdateStationRequest,
        CustodyStatus,
    },
    scope::{PropertyQuery, Scope},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// Contract for every persistence operation against the officer registry, station
/// metadata, the property registry and the status log. Every method returns
/// `Result` so callers can tell "no such row" (`Ok(None)`) from a failed lookup (`Err`):
/// the session verifier fails closed on errors while the record resolver fails open.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Officer registry ---
    async fn get_officer(&self, email: &str) -> RepoResult<Option<Officer>>;
    async fn list_officers(&self) -> RepoResult<Vec<Officer>>;
    /// `None` when an officer with this email already exists.
    async fn create_officer(&self, officer: Officer) -> RepoResult<Option<Officer>>;
    async fn update_officer(
        &self,
        email: &str,
        req: UpdateOfficerRequest,
    ) -> RepoResult<Option<Officer>>;

    // --- Stations & storage metadata ---
    async fn list_stations(&self) -> RepoResult<Vec<Station>>;
    async fn get_station(&self, name: &str) -> RepoResult<Option<Station>>;
    /// `None` when a station with this name already exists.
    async fn create_station(&self, station: Station) -> RepoResult<Option<Station>>;
    async fn update_station(
        &self,
        name: &str,
        req: UpdateStationRequest,
    ) -> RepoResult<Option<Station>>;
    async fn list_racks(&self, station: &str) -> RepoResult<Vec<Rack>>;
    async fn get_rack(&self, id: i64) -> RepoResult<Option<Rack>>;
    async fn create_rack(&self, station: &str, label: &str) -> RepoResult<Rack>;
    async fn list_boxes(&self, rack_id: i64) -> RepoResult<Vec<StorageBox>>;
    async fn create_box(&self, rack_id: i64, label: &str) -> RepoResult<StorageBox>;

    // --- Property registry ---
    /// Exact-match lookup on the full landing URL.
    async fn find_property_by_qr_id(&self, qr_id: &str) -> RepoResult<Option<PropertyRecord>>;
    async fn get_property(&self, property_id: &str) -> RepoResult<Option<PropertyRecord>>;
    /// Inserts one incomplete row per QR URL.
    async fn create_qr_slots(
        &self,
        station: &str,
        qr_ids: Vec<String>,
    ) -> RepoResult<Vec<PropertyRecord>>;
    /// Completes the row addressed by `req.qr_id`, assigning `property_id` and writing the
    /// initial `deposited` status entry. `None` if the row is missing or already complete.
    async fn submit_property(
        &self,
        property_id: &str,
        req: SubmitPropertyRequest,
        officer_email: &str,
    ) -> RepoResult<Option<PropertyRecord>>;
    async fn query_properties(&self, query: &PropertyQuery) -> RepoResult<Vec<PropertyRecord>>;
    async fn add_photo(
        &self,
        property_id: &str,
        resource_key: &str,
    ) -> RepoResult<Option<PropertyRecord>>;
    async fn get_stats(&self, scope: &Scope) -> RepoResult<DashboardStats>;

    // --- Status log (append-only) ---
    /// Appends an entry and mirrors it into the record's `current_status`.
    async fn append_status(&self, entry: NewStatusEntry) -> RepoResult<StatusLogEntry>;
    async fn get_status_log(&self, property_id: &str) -> RepoResult<Vec<StatusLogEntry>>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held by `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

const PROPERTY_COLUMNS: &str = "qr_id, property_id, station, fir_number, offence_category, \
    investigating_officer, description, seized_at, rack_id, box_id, photo_keys, \
    current_status, created_at, submitted_at";

const STATUS_COLUMNS: &str = "id, property_id, status, remarks, officer_email, created_at";

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_officer(&self, email: &str) -> RepoResult<Option<Officer>> {
        let officer = sqlx::query_as::<_, Officer>(
            "SELECT email, name, role, station FROM officers WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(officer)
    }

    async fn list_officers(&self) -> RepoResult<Vec<Officer>> {
        let officers = sqlx::query_as::<_, Officer>(
            "SELECT email, name, role, station FROM officers ORDER BY station, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(officers)
    }

    async fn create_officer(&self, officer: Officer) -> RepoResult<Option<Officer>> {
        let created = sqlx::query_as::<_, Officer>(
            r#"INSERT INTO officers (email, name, role, station)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (email) DO NOTHING
               RETURNING email, name, role, station"#,
        )
        .bind(officer.email)
        .bind(officer.name)
        .bind(officer.role)
        .bind(officer.station)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created)
    }

    /// Partial update; `COALESCE` keeps columns whose field is `None`.
    async fn update_officer(
        &self,
        email: &str,
        req: UpdateOfficerRequest,
    ) -> RepoResult<Option<Officer>> {
        let updated = sqlx::query_as::<_, Officer>(
            r#"UPDATE officers
               SET name = COALESCE($2, name),
                   role = COALESCE($3, role),
                   station = COALESCE($4, station)
               WHERE email = $1
               RETURNING email, name, role, station"#,
        )
        .bind(email)
        .bind(req.name)
        .bind(req.role.map(|r| r.as_str().to_string()))
        .bind(req.station)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn list_stations(&self) -> RepoResult<Vec<Station>> {
        let stations = sqlx::query_as::<_, Station>(
            "SELECT name, district, address, phone FROM stations ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(stations)
    }

    async fn get_station(&self, name: &str) -> RepoResult<Option<Station>> {
        let station = sqlx::query_as::<_, Station>(
            "SELECT name, district, address, phone FROM stations WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(station)
    }

    async fn create_station(&self, station: Station) -> RepoResult<Option<Station>> {
        let created = sqlx::query_as::<_, Station>(
            r#"INSERT INTO stations (name, district, address, phone)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (name) DO NOTHING
               RETURNING name, district, address, phone"#,
        )
        .bind(station.name)
        .bind(station.district)
        .bind(station.address)
        .bind(station.phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_station(
        &self,
        name: &str,
        req: UpdateStationRequest,
    ) -> RepoResult<Option<Station>> {
        let updated = sqlx::query_as::<_, Station>(
            r#"UPDATE stations
               SET district = COALESCE($2, district),
                   address = COALESCE($3, address),
                   phone = COALESCE($4, phone)
               WHERE name = $1
               RETURNING name, district, address, phone"#,
        )
        .bind(name)
        .bind(req.district)
        .bind(req.address)
        .bind(req.phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn list_racks(&self, station: &str) -> RepoResult<Vec<Rack>> {
        let racks = sqlx::query_as::<_, Rack>(
            "SELECT id, station, label FROM racks WHERE station = $1 ORDER BY label",
        )
        .bind(station)
        .fetch_all(&self.pool)
        .await?;
        Ok(racks)
    }

    async fn get_rack(&self, id: i64) -> RepoResult<Option<Rack>> {
        let rack = sqlx::query_as::<_, Rack>("SELECT id, station, label FROM racks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rack)
    }

    async fn create_rack(&self, station: &str, label: &str) -> RepoResult<Rack> {
        let rack = sqlx::query_as::<_, Rack>(
            "INSERT INTO racks (station, label) VALUES ($1, $2) RETURNING id, station, label",
        )
        .bind(station)
        .bind(label)
        .fetch_one(&self.pool)
        .await?;
        Ok(rack)
    }

    async fn list_boxes(&self, rack_id: i64) -> RepoResult<Vec<StorageBox>> {
        let boxes = sqlx::query_as::<_, StorageBox>(
            "SELECT id, rack_id, label FROM storage_boxes WHERE rack_id = $1 ORDER BY label",
        )
        .bind(rack_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(boxes)
    }

    async fn create_box(&self, rack_id: i64, label: &str) -> RepoResult<StorageBox> {
        let storage_box = sqlx::query_as::<_, StorageBox>(
            "INSERT INTO storage_boxes (rack_id, label) VALUES ($1, $2) RETURNING id, rack_id, label",
        )
        .bind(rack_id)
        .bind(label)
        .fetch_one(&self.pool)
        .await?;
        Ok(storage_box)
    }

    async fn find_property_by_qr_id(&self, qr_id: &str) -> RepoResult<Option<PropertyRecord>> {
        let record = sqlx::query_as::<_, PropertyRecord>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE qr_id = $1"
        ))
        .bind(qr_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn get_property(&self, property_id: &str) -> RepoResult<Option<PropertyRecord>> {
        let record = sqlx::query_as::<_, PropertyRecord>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE property_id = $1"
        ))
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn create_qr_slots(
        &self,
        station: &str,
        qr_ids: Vec<String>,
    ) -> RepoResult<Vec<PropertyRecord>> {
        if qr_ids.is_empty() {
            return Ok(vec![]);
        }
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO properties (qr_id, station) ");
        builder.push_values(qr_ids, |mut row, qr_id| {
            row.push_bind(qr_id).push_bind(station.to_string());
        });
        builder.push(format!(" RETURNING {PROPERTY_COLUMNS}"));

        let records = builder
            .build_query_as::<PropertyRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    /// Runs the completion update and the initial status insert in one transaction, so a
    /// complete record always has at least one log entry.
    async fn submit_property(
        &self,
        property_id: &str,
        req: SubmitPropertyRequest,
        officer_email: &str,
    ) -> RepoResult<Option<PropertyRecord>> {
        let initial = CustodyStatus::Deposited.as_str();
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, PropertyRecord>(&format!(
            r#"UPDATE properties
               SET property_id = $2,
                   fir_number = $3,
                   offence_category = $4,
                   investigating_officer = $5,
                   description = $6,
                   seized_at = $7,
                   rack_id = $8,
                   box_id = $9,
                   current_status = $10,
                   submitted_at = NOW()
               WHERE qr_id = $1 AND (property_id IS NULL OR property_id = '')
               RETURNING {PROPERTY_COLUMNS}"#
        ))
        .bind(&req.qr_id)
        .bind(property_id)
        .bind(req.fir_number)
        .bind(req.offence_category)
        .bind(req.investigating_officer)
        .bind(req.description)
        .bind(req.seized_at)
        .bind(req.rack_id)
        .bind(req.box_id)
        .bind(initial)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(record) = record else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO status_logs (property_id, status, remarks, officer_email) VALUES ($1, $2, NULL, $3)",
        )
        .bind(property_id)
        .bind(initial)
        .bind(officer_email)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(record))
    }

    async fn query_properties(&self, query: &PropertyQuery) -> RepoResult<Vec<PropertyRecord>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties \
             WHERE property_id IS NOT NULL AND property_id <> ''"
        ));
        query.push_filters(&mut builder);
        builder.push(" ORDER BY submitted_at DESC");

        let records = builder
            .build_query_as::<PropertyRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn add_photo(
        &self,
        property_id: &str,
        resource_key: &str,
    ) -> RepoResult<Option<PropertyRecord>> {
        let record = sqlx::query_as::<_, PropertyRecord>(&format!(
            r#"UPDATE properties SET photo_keys = array_append(photo_keys, $2)
               WHERE property_id = $1
               RETURNING {PROPERTY_COLUMNS}"#
        ))
        .bind(property_id)
        .bind(resource_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn get_stats(&self, scope: &Scope) -> RepoResult<DashboardStats> {
        let mut complete: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM properties WHERE property_id IS NOT NULL AND property_id <> ''",
        );
        scope.push_constraint(&mut complete, "station");
        let total_properties = complete
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut pending: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM properties WHERE (property_id IS NULL OR property_id = '')",
        );
        scope.push_constraint(&mut pending, "station");
        let pending_labels = pending
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut entries: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM status_logs l JOIN properties p ON p.property_id = l.property_id WHERE TRUE",
        );
        scope.push_constraint(&mut entries, "p.station");
        let status_entries = entries
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(DashboardStats {
            total_properties,
            pending_labels,
            status_entries,
        })
    }

    /// Insert and `current_status` mirror share one statement via a CTE.
    async fn append_status(&self, entry: NewStatusEntry) -> RepoResult<StatusLogEntry> {
        let created = sqlx::query_as::<_, StatusLogEntry>(&format!(
            r#"WITH inserted AS (
                   INSERT INTO status_logs (property_id, status, remarks, officer_email)
                   VALUES ($1, $2, $3, $4)
                   RETURNING {STATUS_COLUMNS}
               ), mirrored AS (
                   UPDATE properties SET current_status = $2 WHERE property_id = $1
               )
               SELECT {STATUS_COLUMNS} FROM inserted"#
        ))
        .bind(entry.property_id)
        .bind(entry.status)
        .bind(entry.remarks)
        .bind(entry.officer_email)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn get_status_log(&self, property_id: &str) -> RepoResult<Vec<StatusLogEntry>> {
        let entries = sqlx::query_as::<_, StatusLogEntry>(&format!(
            "SELECT {STATUS_COLUMNS} FROM status_logs WHERE property_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

// --- In-memory implementation (tests and local scaffolding) ---

#[derive(Default)]
struct Tables {
    officers: Vec<Officer>,
    stations: Vec<Station>,
    racks: Vec<Rack>,
    boxes: Vec<StorageBox>,
    properties: Vec<PropertyRecord>,
    status_logs: Vec<StatusLogEntry>,
}

/// InMemoryRepository
///
/// `Repository` over plain vectors, used to exercise handlers and the gate without a
/// database. Lookups can be switched to fail so the fail-open and fail-closed paths can be
/// driven deterministically.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    fail_officer_lookups: AtomicBool,
    fail_property_lookups: AtomicBool,
    fail_queries: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_officer(self, officer: Officer) -> Self {
        self.lock().officers.push(officer);
        self
    }

    pub fn with_station(self, station: Station) -> Self {
        self.lock().stations.push(station);
        self
    }

    pub fn with_property(self, record: PropertyRecord) -> Self {
        self.lock().properties.push(record);
        self
    }

    /// Removes an officer, simulating revocation.
    pub fn revoke_officer(&self, email: &str) {
        self.lock().officers.retain(|o| o.email != email);
    }

    pub fn set_fail_officer_lookups(&self, fail: bool) {
        self.fail_officer_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_property_lookups(&self, fail: bool) {
        self.fail_property_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(flag: &AtomicBool) -> RepoResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_officer(&self, email: &str) -> RepoResult<Option<Officer>> {
        Self::check(&self.fail_officer_lookups)?;
        Ok(self.lock().officers.iter().find(|o| o.email == email).cloned())
    }

    async fn list_officers(&self) -> RepoResult<Vec<Officer>> {
        Self::check(&self.fail_queries)?;
        Ok(self.lock().officers.clone())
    }

    async fn create_officer(&self, officer: Officer) -> RepoResult<Option<Officer>> {
        Self::check(&self.fail_queries)?;
        let mut tables = self.lock();
        if tables.officers.iter().any(|o| o.email == officer.email) {
            return Ok(None);
        }
        tables.officers.push(officer.clone());
        Ok(Some(officer))
    }

    async fn update_officer(
        &self,
        email: &str,
        req: UpdateOfficerRequest,
    ) -> RepoResult<Option<Officer>> {
        Self::check(&self.fail_queries)?;
        let mut tables = self.lock();
        let Some(officer) = tables.officers.iter_mut().find(|o| o.email == email) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            officer.name = name;
        }
        if let Some(role) = req.role {
            officer.role = role.as_str().to_string();
        }
        if let Some(station) = req.station {
            officer.station = station;
        }
        Ok(Some(officer.clone()))
    }

    async fn list_stations(&self) -> RepoResult<Vec<Station>> {
        Self::check(&self.fail_queries)?;
        let mut stations = self.lock().stations.clone();
        stations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stations)
    }

    async fn get_station(&self, name: &str) -> RepoResult<Option<Station>> {
        Self::check(&self.fail_queries)?;
        Ok(self.lock().stations.iter().find(|s| s.name == name).cloned())
    }

    async fn create_station(&self, station: Station) -> RepoResult<Option<Station>> {
        Self::check(&self.fail_queries)?;
        let mut tables = self.lock();
        if tables.stations.iter().any(|s| s.name == station.name) {
            return Ok(None);
        }
        tables.stations.push(station.clone());
        Ok(Some(station))
    }

    async fn update_station(
        &self,
        name: &str,
        req: UpdateStationRequest,
    ) -> RepoResult<Option<Station>> {
        Self::check(&self.fail_queries)?;
        let mut tables = self.lock();
        let Some(station) = tables.stations.iter_mut().find(|s| s.name == name) else {
            return Ok(None);
        };
        if req.district.is_some() {
            station.district = req.district;
        }
        if req.address.is_some() {
            station.address = req.address;
        }
        if req.phone.is_some() {
            station.phone = req.phone;
        }
        Ok(Some(station.clone()))
    }

    async fn list_racks(&self, station: &str) -> RepoResult<Vec<Rack>> {
        Self::check(&self.fail_queries)?;
        Ok(self
            .lock()
            .racks
            .iter()
            .filter(|r| r.station == station)
            .cloned()
            .collect())
    }

    async fn get_rack(&self, id: i64) -> RepoResult<Option<Rack>> {
        Self::check(&self.fail_queries)?;
        Ok(self.lock().racks.iter().find(|r| r.id == id).cloned())
    }

    async fn create_rack(&self, station: &str, label: &str) -> RepoResult<Rack> {
        Self::check(&self.fail_queries)?;
        let mut tables = self.lock();
        let rack = Rack {
            id: tables.racks.len() as i64 + 1,
            station: station.to_string(),
            label: label.to_string(),
        };
        tables.racks.push(rack.clone());
        Ok(rack)
    }

    async fn list_boxes(&self, rack_id: i64) -> RepoResult<Vec<StorageBox>> {
        Self::check(&self.fail_queries)?;
        Ok(self
            .lock()
            .boxes
            .iter()
            .filter(|b| b.rack_id == rack_id)
            .cloned()
            .collect())
    }

    async fn create_box(&self, rack_id: i64, label: &str) -> RepoResult<StorageBox> {
        Self::check(&self.fail_queries)?;
        let mut tables = self.lock();
        let storage_box = StorageBox {
            id: tables.boxes.len() as i64 + 1,
            rack_id,
            label: label.to_string(),
        };
        tables.boxes.push(storage_box.clone());
        Ok(storage_box)
    }

    async fn find_property_by_qr_id(&self, qr_id: &str) -> RepoResult<Option<PropertyRecord>> {
        Self::check(&self.fail_property_lookups)?;
        Ok(self
            .lock()
            .properties
            .iter()
            .find(|p| p.qr_id == qr_id)
            .cloned())
    }

    async fn get_property(&self, property_id: &str) -> RepoResult<Option<PropertyRecord>> {
        Self::check(&self.fail_queries)?;
        Ok(self
            .lock()
            .properties
            .iter()
            .find(|p| p.completed_id() == Some(property_id))
            .cloned())
    }

    async fn create_qr_slots(
        &self,
        station: &str,
        qr_ids: Vec<String>,
    ) -> RepoResult<Vec<PropertyRecord>> {
        Self::check(&self.fail_queries)?;
        let mut tables = self.lock();
        let now = Utc::now();
        let created: Vec<PropertyRecord> = qr_ids
            .into_iter()
            .map(|qr_id| PropertyRecord {
                qr_id,
                station: station.to_string(),
                created_at: now,
                ..PropertyRecord::default()
            })
            .collect();
        tables.properties.extend(created.iter().cloned());
        Ok(created)
    }

    async fn submit_property(
        &self,
        property_id: &str,
        req: SubmitPropertyRequest,
        officer_email: &str,
    ) -> RepoResult<Option<PropertyRecord>> {
        Self::check(&self.fail_queries)?;
        let mut tables = self.lock();
        let now = Utc::now();
        let initial = CustodyStatus::Deposited.as_str().to_string();

        let Some(record) = tables
            .properties
            .iter_mut()
            .find(|p| p.qr_id == req.qr_id && p.completed_id().is_none())
        else {
            return Ok(None);
        };
        record.property_id = Some(property_id.to_string());
        record.fir_number = req.fir_number;
        record.offence_category = req.offence_category;
        record.investigating_officer = req.investigating_officer;
        record.description = req.description;
        record.seized_at = req.seized_at;
        record.rack_id = req.rack_id;
        record.box_id = req.box_id;
        record.current_status = Some(initial.clone());
        record.submitted_at = Some(now);
        let completed = record.clone();

        let id = tables.status_logs.len() as i64 + 1;
        tables.status_logs.push(StatusLogEntry {
            id,
            property_id: property_id.to_string(),
            status: initial,
            remarks: None,
            officer_email: officer_email.to_string(),
            created_at: now,
        });
        Ok(Some(completed))
    }

    async fn query_properties(&self, query: &PropertyQuery) -> RepoResult<Vec<PropertyRecord>> {
        Self::check(&self.fail_queries)?;
        let mut records: Vec<PropertyRecord> = self
            .lock()
            .properties
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(records)
    }

    async fn add_photo(
        &self,
        property_id: &str,
        resource_key: &str,
    ) -> RepoResult<Option<PropertyRecord>> {
        Self::check(&self.fail_queries)?;
        let mut tables = self.lock();
        let Some(record) = tables
            .properties
            .iter_mut()
            .find(|p| p.completed_id() == Some(property_id))
        else {
            return Ok(None);
        };
        record.photo_keys.push(resource_key.to_string());
        Ok(Some(record.clone()))
    }

    async fn get_stats(&self, scope: &Scope) -> RepoResult<DashboardStats> {
        Self::check(&self.fail_queries)?;
        let tables = self.lock();
        let visible = tables.properties.iter().filter(|p| scope.allows(&p.station));
        let (complete, pending): (Vec<_>, Vec<_>) =
            visible.partition(|p| p.completed_id().is_some());
        let status_entries = tables
            .status_logs
            .iter()
            .filter(|entry| {
                complete
                    .iter()
                    .any(|p| p.completed_id() == Some(entry.property_id.as_str()))
            })
            .count();

        Ok(DashboardStats {
            total_properties: complete.len() as i64,
            pending_labels: pending.len() as i64,
            status_entries: status_entries as i64,
        })
    }

    async fn append_status(&self, entry: NewStatusEntry) -> RepoResult<StatusLogEntry> {
        Self::check(&self.fail_queries)?;
        let mut tables = self.lock();
        let created = StatusLogEntry {
            id: tables.status_logs.len() as i64 + 1,
            property_id: entry.property_id,
            status: entry.status,
            remarks: entry.remarks,
            officer_email: entry.officer_email,
            created_at: Utc::now(),
        };
        if let Some(record) = tables
            .properties
            .iter_mut()
            .find(|p| p.completed_id() == Some(created.property_id.as_str()))
        {
            record.current_status = Some(created.status.clone());
        }
        tables.status_logs.push(created.clone());
        Ok(created)
    }

    async fn get_status_log(&self, property_id: &str) -> RepoResult<Vec<StatusLogEntry>> {
        Self::check(&self.fail_queries)?;
        Ok(self
            .lock()
            .status_logs
            .iter()
            .filter(|e| e.property_id == property_id)
            .cloned()
            .collect())
    }
}
