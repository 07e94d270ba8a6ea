use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::config::StorageOptions;
use crate::geo::{self, Geo};
use crate::search::{FilterSpec, SortSpec, MAX_RATE};

mod schema;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub const RATE_LABELS: [&str; 5] = ["1", "2", "3", "4", "5"];
pub const UPDATE_LABELS: [&str; 3] = ["today", "past", "never"];

const SELECT_COLUMNS: &str = "id, name, rate, lat, lng, address, created_at, updated_at";

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub rate: u8,
    pub geo: Geo,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Location {
    pub fn was_updated(&self) -> bool {
        self.updated_at != self.created_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            rate: row.get::<_, i64>(2)?.clamp(1, i64::from(MAX_RATE)) as u8,
            geo: Geo::new(row.get(3)?, row.get(4)?, row.get::<_, String>(5)?),
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

/// Input to [`StorageHandle::save`]: no id creates, an id updates.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationDraft {
    pub id: Option<String>,
    pub name: String,
    pub rate: i64,
    pub geo: Geo,
}

impl LocationDraft {
    pub fn new(name: impl Into<String>, rate: i64, geo: Geo) -> Self {
        Self {
            id: None,
            name: name.into(),
            rate,
            geo,
        }
    }
}

impl From<&Location> for LocationDraft {
    fn from(loc: &Location) -> Self {
        Self {
            id: Some(loc.id.clone()),
            name: loc.name.clone(),
            rate: i64::from(loc.rate),
            geo: loc.geo.clone(),
        }
    }
}

/// Label -> count in display order, plus the number of records counted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BucketCounts {
    pub counts: IndexMap<String, u32>,
    pub total: u32,
}

impl BucketCounts {
    pub(crate) fn with_labels(labels: &[&str]) -> Self {
        Self {
            counts: labels.iter().map(|label| (label.to_string(), 0)).collect(),
            total: 0,
        }
    }

    fn bump(&mut self, label: &str) {
        if let Some(count) = self.counts.get_mut(label) {
            *count += 1;
            self.total += 1;
        }
    }

    pub fn get(&self, label: &str) -> u32 {
        self.counts.get(label).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
struct ViewSettings {
    sort: SortSpec,
    filter: FilterSpec,
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
    view: Arc<Mutex<ViewSettings>>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// Locations under the current sort and filter settings.
    pub fn query(&self) -> Result<Vec<Location>> {
        let ViewSettings { sort, filter } = self.view.lock().clone();
        let order = match sort.field {
            Some(field) => format!(
                "{} {}, created_at ASC, rowid ASC",
                field.order_expr(),
                sort.direction.sql()
            ),
            None => "created_at ASC, rowid ASC".to_string(),
        };
        let mut locs = self.with_connection(|conn| {
            let sql = format!(
                "SELECT {SELECT_COLUMNS}
                 FROM locations
                 WHERE rate >= ?1
                 ORDER BY {order}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![i64::from(filter.min_rate)], Location::from_row)?
                .collect::<Result<Vec<_>, _>>()
                .context("querying locations")?;
            Ok(rows)
        })?;
        // LIKE only folds ASCII case
        if !filter.txt.is_empty() {
            locs.retain(|loc| filter.matches_name(&loc.name));
        }
        Ok(locs)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Location> {
        self.find_by_id(id)?
            .with_context(|| format!("location {id} not found"))
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<Location>> {
        self.with_connection(|conn| {
            let sql = format!("SELECT {SELECT_COLUMNS} FROM locations WHERE id = ?1");
            conn.query_row(&sql, params![id], Location::from_row)
                .optional()
                .context("fetching location")
        })
    }

    /// Creates or updates, stamping timestamps. The rate is clamped to 1..=5.
    pub fn save(&self, draft: LocationDraft) -> Result<Location> {
        let name = draft.name.trim();
        if name.is_empty() {
            bail!("location name cannot be empty");
        }
        let rate = draft.rate.clamp(1, i64::from(MAX_RATE));
        let now = geo::now_millis();
        match draft.id {
            None => {
                let id = Uuid::new_v4().simple().to_string();
                self.with_connection(|conn| {
                    conn.execute(
                        "INSERT INTO locations (id, name, rate, lat, lng, address, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                        params![id, name, rate, draft.geo.lat, draft.geo.lng, draft.geo.address, now],
                    )
                    .context("inserting location")?;
                    Ok(())
                })?;
                tracing::debug!(%id, "location created");
                self.get_by_id(&id)
            }
            Some(id) => {
                self.with_connection(|conn| {
                    // keep updated_at distinct from created_at even within the same millisecond
                    let updated = conn
                        .execute(
                            "UPDATE locations
                             SET name = ?1, rate = ?2, lat = ?3, lng = ?4, address = ?5,
                                 updated_at = MAX(?6, created_at + 1)
                             WHERE id = ?7",
                            params![
                                name,
                                rate,
                                draft.geo.lat,
                                draft.geo.lng,
                                draft.geo.address,
                                now,
                                id
                            ],
                        )
                        .context("updating location")?;
                    if updated == 0 {
                        bail!("location {id} not found");
                    }
                    Ok(())
                })?;
                self.get_by_id(&id)
            }
        }
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            let removed = conn
                .execute("DELETE FROM locations WHERE id = ?1", params![id])
                .context("deleting location")?;
            if removed == 0 {
                bail!("location {id} not found");
            }
            Ok(())
        })
    }

    pub fn set_sort_by(&self, sort: SortSpec) {
        self.view.lock().sort = sort;
    }

    pub fn sort(&self) -> SortSpec {
        self.view.lock().sort
    }

    /// Stores the normalized filter and hands it back for the query string.
    pub fn set_filter_by(&self, filter: FilterSpec) -> FilterSpec {
        let normalized = filter.normalized();
        self.view.lock().filter = normalized.clone();
        normalized
    }

    pub fn filter(&self) -> FilterSpec {
        self.view.lock().filter.clone()
    }

    /// Counts over every stored location, ignoring the active filter.
    pub fn loc_count_by_rate_map(&self) -> Result<BucketCounts> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT rate, COUNT(*) FROM locations GROUP BY rate")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<Result<Vec<_>, _>>()
                .context("counting locations by rate")?;
            let mut buckets = BucketCounts::with_labels(&RATE_LABELS);
            for (rate, count) in rows {
                let label = rate.clamp(1, i64::from(MAX_RATE)).to_string();
                if let Some(slot) = buckets.counts.get_mut(&label) {
                    *slot += count as u32;
                    buckets.total += count as u32;
                }
            }
            Ok(buckets)
        })
    }

    pub fn loc_count_by_update_map(&self) -> Result<BucketCounts> {
        self.loc_count_by_update_map_at(geo::now_millis())
    }

    pub fn loc_count_by_update_map_at(&self, now_ms: i64) -> Result<BucketCounts> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT created_at, updated_at FROM locations")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<Result<Vec<_>, _>>()
                .context("counting locations by update")?;
            let mut buckets = BucketCounts::with_labels(&UPDATE_LABELS);
            for (created_at, updated_at) in rows {
                buckets.bump(update_bucket(created_at, updated_at, now_ms));
            }
            Ok(buckets)
        })
    }

    pub fn count(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))
                .context("counting locations")?;
            Ok(count as usize)
        })
    }
}

fn update_bucket(created_at: i64, updated_at: i64, now_ms: i64) -> &'static str {
    if updated_at == created_at {
        "never"
    } else if now_ms - updated_at < DAY_MS {
        "today"
    } else {
        "past"
    }
}

pub fn init(storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = &storage.database_path;
    if db_path.as_os_str().is_empty() {
        bail!("database path is not configured");
    }
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    if !existed && storage.seed_demo_data {
        seed_initial_locations(&conn)?;
    }
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
        view: Arc::new(Mutex::new(ViewSettings::default())),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

fn seed_initial_locations(conn: &Connection) -> Result<()> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM locations LIMIT 1", [], |row| row.get(0))
        .optional()
        .context("checking for existing locations")?;
    if existing.is_some() {
        return Ok(());
    }

    tracing::info!("seeding first-run locations");
    let now = geo::now_millis();
    let seeds = [
        ("Greatplace", 5, 32.047104, 34.832384, "Ramat Gan, Israel"),
        ("Neveragain", 2, 32.047201, 34.832581, "Givatayim, Israel"),
        ("Yarkon Park", 4, 32.098637, 34.813713, "Tel Aviv-Yafo, Israel"),
    ];
    let total = seeds.len() as i64;
    for (offset, (name, rate, lat, lng, address)) in seeds.into_iter().enumerate() {
        // staggered so creation order is stable
        let created_at = now - (total - offset as i64) * 1000;
        conn.execute(
            "INSERT INTO locations (id, name, rate, lat, lng, address, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                Uuid::new_v4().simple().to_string(),
                name,
                rate,
                lat,
                lng,
                address,
                created_at
            ],
        )
        .context("inserting seed location")?;
    }

    Ok(())
}
