//! SQLite-backed participant store.
//!
//! The store is the coordination device for issuance: the generation claim
//! is a single guarded `UPDATE` whose affected-row count tells the caller
//! whether it won. Every operation opens its own connection and drops it on
//! return, so no transaction outlives a single call.
//!
//! All methods are blocking. Async callers go through [`ParticipantStore::run`],
//! which moves the work onto the blocking thread pool.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row, Transaction};

use crate::participant::{
    DepartmentStats, Entrant, EventStats, MemberRole, ParticipantRecord, RecordFilter, TeamEntry,
};
use crate::roll::normalize_department;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS participants (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        roll_no TEXT NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        department TEXT NOT NULL DEFAULT '',
        year TEXT NOT NULL DEFAULT '',
        event TEXT NOT NULL,
        source TEXT NOT NULL DEFAULT '',
        cert_url TEXT,
        generating INTEGER NOT NULL DEFAULT 0,
        blocked INTEGER NOT NULL DEFAULT 0,
        member_role TEXT NOT NULL DEFAULT 'leader',
        leader_roll_no TEXT,
        member_position INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT
    );

    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    INSERT OR IGNORE INTO settings (key, value) VALUES ('maintenance', 'false');
";

const INDEX_SQL: &str = r"
    CREATE INDEX IF NOT EXISTS idx_participants_roll_event
        ON participants(roll_no, event);
    CREATE INDEX IF NOT EXISTS idx_participants_team
        ON participants(leader_roll_no, event);
";

/// Columns added to databases created by earlier versions of the portal.
const UPGRADE_COLUMNS: &[(&str, &str)] = &[
    ("source", "TEXT NOT NULL DEFAULT ''"),
    ("cert_url", "TEXT"),
    ("generating", "INTEGER NOT NULL DEFAULT 0"),
    ("blocked", "INTEGER NOT NULL DEFAULT 0"),
    ("member_role", "TEXT NOT NULL DEFAULT 'leader'"),
    ("leader_roll_no", "TEXT"),
    ("member_position", "INTEGER NOT NULL DEFAULT 0"),
    ("updated_at", "TEXT"),
];

const RECORD_COLUMNS: &str = "id, roll_no, name, department, year, event, source, cert_url, \
     generating, blocked, member_role, leader_roll_no, member_position, updated_at";

/// Leaders sort before members so lookups prefer the leader row.
const LEADER_FIRST: &str = "CASE member_role WHEN 'leader' THEN 0 ELSE 1 END";

/// True when any row of the same `(roll_no, event)` pair is blocked. A block
/// on one row suppresses the whole pair.
const PAIR_BLOCKED: &str = "EXISTS (SELECT 1 FROM participants b \
     WHERE b.roll_no = participants.roll_no AND b.event = participants.event AND b.blocked != 0)";

const MAINTENANCE_KEY: &str = "maintenance";

/// Errors from the participant store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The addressed record does not exist.
    #[error("participant record {id} not found")]
    NotFound {
        /// Record id that was looked up.
        id: i64,
    },

    /// The blocking task running a store operation failed.
    #[error("store task failed: {0}")]
    Task(String),
}

/// Result of synchronizing one team row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamSyncOutcome {
    /// Id of the leader record.
    pub leader_id: i64,
    /// True if the leader record was created by this call.
    pub leader_inserted: bool,
    /// Number of member rows written.
    pub members_written: usize,
}

/// Handle to the participant database file.
///
/// Cheap to clone; holds only the path.
#[derive(Debug, Clone)]
pub struct ParticipantStore {
    path: PathBuf,
}

impl ParticipantStore {
    /// Opens (creating if needed) the store at `path`.
    ///
    /// Creates missing tables, adds columns missing from older databases
    /// and seeds the maintenance setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { path: path.into() };
        let conn = store.connect()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "opened participant store");
        conn.execute_batch(SCHEMA_SQL)?;
        let added = upgrade_columns(&conn)?;
        if !added.is_empty() {
            tracing::info!(columns = ?added, "upgraded participants table");
        }
        conn.execute_batch(INDEX_SQL)?;
        Ok(store)
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Runs a blocking store operation on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or [`StoreError::Task`] if the
    /// blocking task panicked or was cancelled.
    pub async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Self) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Checks that the database answers queries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable.
    pub fn ping(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Synchronization writes
    // ------------------------------------------------------------------

    /// Writes one source row: upserts the leader and replaces its members,
    /// atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is written then.
    pub fn sync_team(&self, entry: &TeamEntry) -> Result<TeamSyncOutcome, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let (leader_id, leader_inserted) =
            upsert_leader_in(&tx, &entry.event, &entry.source, &entry.leader)?;
        let members_written = replace_members_in(
            &tx,
            &entry.leader.roll_no,
            &entry.event,
            &entry.source,
            &entry.members,
        )?;
        tx.commit()?;
        Ok(TeamSyncOutcome {
            leader_id,
            leader_inserted,
            members_written,
        })
    }

    /// Inserts or updates the leader record for `(roll_no, event)`.
    ///
    /// Updates touch only name, department, year and source; the
    /// certificate, claim and block flags are left as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn upsert_leader(
        &self,
        event: &str,
        source: &str,
        leader: &Entrant,
    ) -> Result<i64, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let (id, _) = upsert_leader_in(&tx, event, source, leader)?;
        tx.commit()?;
        Ok(id)
    }

    /// Replaces every member row of `(leader_roll_no, event)` with `members`.
    ///
    /// Members whose roll number is still on the team keep their
    /// certificate URL and block flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn replace_members(
        &self,
        leader_roll_no: &str,
        event: &str,
        source: &str,
        members: &[Entrant],
    ) -> Result<usize, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let written = replace_members_in(&tx, leader_roll_no, event, source, members)?;
        tx.commit()?;
        Ok(written)
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Returns the eligible records for a roll number, one per event, leader
    /// rows preferred. Events where any row of the pair is blocked are left
    /// out.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_for_roll(&self, roll_no: &str) -> Result<Vec<ParticipantRecord>, StoreError> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM participants \
             WHERE roll_no = ?1 AND NOT {PAIR_BLOCKED} \
             ORDER BY event, {LEADER_FIRST}, id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![roll_no], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        Ok(rows
            .into_iter()
            .filter(|record| seen.insert(record.event.clone()))
            .collect())
    }

    /// Returns the record used for issuing `(roll_no, event)`.
    ///
    /// A blocked row of the pair is returned ahead of any other, so a block
    /// on either a leader or a member row suppresses issuance. Otherwise the
    /// leader row is preferred.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_record(
        &self,
        roll_no: &str,
        event: &str,
    ) -> Result<Option<ParticipantRecord>, StoreError> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM participants \
             WHERE roll_no = ?1 AND event = ?2 \
             ORDER BY blocked DESC, {LEADER_FIRST}, id LIMIT 1"
        );
        Ok(conn
            .query_row(&sql, params![roll_no, event], record_from_row)
            .optional()?)
    }

    /// Returns a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, id: i64) -> Result<Option<ParticipantRecord>, StoreError> {
        let conn = self.connect()?;
        get_in(&conn, id)
    }

    /// Lists records for administration.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_records(&self, filter: &RecordFilter) -> Result<Vec<ParticipantRecord>, StoreError> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM participants \
             WHERE (?1 IS NULL OR event = ?1) AND (?2 IS NULL OR roll_no = ?2) \
             ORDER BY event, COALESCE(leader_roll_no, roll_no), member_position, id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![filter.event.as_deref(), filter.roll_no.as_deref()],
                record_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Lists records without a certificate whose pair has no blocked row.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_pending(&self, event: Option<&str>) -> Result<Vec<ParticipantRecord>, StoreError> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM participants \
             WHERE cert_url IS NULL AND NOT {PAIR_BLOCKED} AND (?1 IS NULL OR event = ?1) \
             ORDER BY event, roll_no, {LEADER_FIRST}, id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![event], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Returns per-event issuance totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn event_stats(&self) -> Result<Vec<EventStats>, StoreError> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT event,
                    COUNT(*),
                    SUM(cert_url IS NOT NULL),
                    SUM(blocked != 0),
                    SUM(cert_url IS NULL AND NOT {PAIR_BLOCKED})
             FROM participants
             GROUP BY event
             ORDER BY event"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EventStats {
                    event: row.get(0)?,
                    records: count(row.get(1)?),
                    issued: count(row.get(2)?),
                    blocked: count(row.get(3)?),
                    pending: count(row.get(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Counts unique participants per normalized department.
    ///
    /// Each roll number is attributed to the department of its earliest
    /// record. Results are ordered by count, largest first, then by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn department_breakdown(&self) -> Result<Vec<DepartmentStats>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT roll_no, department FROM participants ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for (roll_no, department) in rows {
            if seen.insert(roll_no) {
                *counts.entry(normalize_department(&department)).or_default() += 1;
            }
        }

        let mut breakdown: Vec<DepartmentStats> = counts
            .into_iter()
            .map(|(department, participants)| DepartmentStats {
                department,
                participants,
            })
            .collect();
        breakdown.sort_by(|a, b| {
            b.participants
                .cmp(&a.participants)
                .then_with(|| a.department.cmp(&b.department))
        });
        Ok(breakdown)
    }

    // ------------------------------------------------------------------
    // Issuance claim protocol
    // ------------------------------------------------------------------

    /// Attempts to claim generation for a record.
    ///
    /// Returns `true` for exactly one caller while the record is unissued,
    /// unclaimed and unblocked.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn try_claim(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE participants SET generating = 1, updated_at = ?2
             WHERE id = ?1 AND cert_url IS NULL AND generating = 0 AND blocked = 0",
            params![id, Utc::now()],
        )?;
        Ok(changed == 1)
    }

    /// Persists the certificate URL for a claimed record and releases the
    /// claim.
    ///
    /// Other rows for the same `(roll_no, event)` without a URL receive it
    /// too. Returns the number of rows updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn complete_claim(
        &self,
        id: i64,
        roll_no: &str,
        event: &str,
        cert_url: &str,
    ) -> Result<usize, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = Utc::now();
        let mut updated = tx.execute(
            "UPDATE participants SET cert_url = ?2, generating = 0, updated_at = ?3 WHERE id = ?1",
            params![id, cert_url, now],
        )?;
        updated += tx.execute(
            "UPDATE participants SET cert_url = ?3, updated_at = ?4
             WHERE roll_no = ?1 AND event = ?2 AND cert_url IS NULL",
            params![roll_no, event, cert_url, now],
        )?;
        tx.commit()?;
        Ok(updated)
    }

    /// Clears the claim flag of a record. Returns whether a claim was held.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn release_claim(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE participants SET generating = 0 WHERE id = ?1 AND generating = 1",
            params![id],
        )?;
        Ok(changed == 1)
    }

    /// Clears every claim flag. Run once at startup: a claim can only
    /// survive a restart if its holder crashed mid-generation.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn release_stale_claims(&self) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let released = conn.execute(
            "UPDATE participants SET generating = 0 WHERE generating = 1",
            [],
        )?;
        Ok(released)
    }

    // ------------------------------------------------------------------
    // Administrative controls
    // ------------------------------------------------------------------

    /// Sets or clears the block flag of a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record does not exist.
    pub fn set_blocked(&self, id: i64, blocked: bool) -> Result<ParticipantRecord, StoreError> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE participants SET blocked = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, blocked, Utc::now()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id });
        }
        get_in(&conn, id)?.ok_or(StoreError::NotFound { id })
    }

    /// Clears the certificate URL of a record and of every other row for the
    /// same `(roll_no, event)`, so the next request regenerates it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record does not exist.
    pub fn reset_certificate(&self, id: i64) -> Result<ParticipantRecord, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let key: Option<(String, String)> = tx
            .query_row(
                "SELECT roll_no, event FROM participants WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((roll_no, event)) = key else {
            return Err(StoreError::NotFound { id });
        };
        tx.execute(
            "UPDATE participants SET cert_url = NULL, updated_at = ?3
             WHERE roll_no = ?1 AND event = ?2",
            params![roll_no, event, Utc::now()],
        )?;
        let record = get_in(&tx, id)?.ok_or(StoreError::NotFound { id })?;
        tx.commit()?;
        Ok(record)
    }

    /// Returns the maintenance flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn maintenance(&self) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![MAINTENANCE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.is_some_and(|v| v.eq_ignore_ascii_case("true")))
    }

    /// Sets the maintenance flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set_maintenance(&self, enabled: bool) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![MAINTENANCE_KEY, if enabled { "true" } else { "false" }],
        )?;
        Ok(())
    }
}

fn upgrade_columns(conn: &Connection) -> Result<Vec<&'static str>, StoreError> {
    let existing: HashSet<String> = {
        let mut stmt = conn.prepare("PRAGMA table_info(participants)")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<HashSet<_>, _>>()?;
        names
    };

    let mut added = Vec::new();
    for (column, definition) in UPGRADE_COLUMNS {
        if !existing.contains(*column) {
            conn.execute_batch(&format!(
                "ALTER TABLE participants ADD COLUMN {column} {definition}"
            ))?;
            added.push(*column);
        }
    }
    Ok(added)
}

fn upsert_leader_in(
    tx: &Transaction<'_>,
    event: &str,
    source: &str,
    leader: &Entrant,
) -> Result<(i64, bool), StoreError> {
    let now = Utc::now();
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM participants
             WHERE roll_no = ?1 AND event = ?2 AND member_role = 'leader'
             ORDER BY id LIMIT 1",
            params![leader.roll_no, event],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        tx.execute(
            "UPDATE participants
             SET name = ?2, department = ?3, year = ?4, source = ?5, updated_at = ?6
             WHERE id = ?1",
            params![id, leader.name, leader.department, leader.year, source, now],
        )?;
        return Ok((id, false));
    }

    tx.execute(
        "INSERT INTO participants
            (roll_no, name, department, year, event, source, member_role, member_position, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'leader', 0, ?7)",
        params![
            leader.roll_no,
            leader.name,
            leader.department,
            leader.year,
            event,
            source,
            now
        ],
    )?;
    Ok((tx.last_insert_rowid(), true))
}

/// Per-member state that survives a team replacement.
struct RetainedMember {
    id: i64,
    cert_url: Option<String>,
    blocked: bool,
    generating: bool,
}

fn replace_members_in(
    tx: &Transaction<'_>,
    leader_roll_no: &str,
    event: &str,
    source: &str,
    members: &[Entrant],
) -> Result<usize, StoreError> {
    let mut retained: HashMap<String, RetainedMember> = {
        let mut stmt = tx.prepare(
            "SELECT roll_no, id, cert_url, blocked, generating FROM participants
             WHERE leader_roll_no = ?1 AND event = ?2 AND member_role = 'member'",
        )?;
        let rows = stmt
            .query_map(params![leader_roll_no, event], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    RetainedMember {
                        id: row.get(1)?,
                        cert_url: row.get(2)?,
                        blocked: row.get(3)?,
                        generating: row.get(4)?,
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        rows
    };

    tx.execute(
        "DELETE FROM participants
         WHERE leader_roll_no = ?1 AND event = ?2 AND member_role = 'member'",
        params![leader_roll_no, event],
    )?;

    // A surviving member is reinserted under its old id, so an in-flight
    // claim keeps addressing the same row and stays held.
    let now = Utc::now();
    let mut stmt = tx.prepare(
        "INSERT INTO participants
            (id, roll_no, name, department, year, event, source, cert_url, blocked, generating,
             member_role, leader_roll_no, member_position, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'member', ?11, ?12, ?13)",
    )?;
    for (index, member) in members.iter().enumerate() {
        let kept = retained.remove(&member.roll_no);
        let position = u32::try_from(index + 1).unwrap_or(u32::MAX);
        stmt.execute(params![
            kept.as_ref().map(|m| m.id),
            member.roll_no,
            member.name,
            member.department,
            member.year,
            event,
            source,
            kept.as_ref().and_then(|m| m.cert_url.clone()),
            kept.as_ref().is_some_and(|m| m.blocked),
            kept.as_ref().is_some_and(|m| m.generating),
            leader_roll_no,
            position,
            now
        ])?;
    }
    Ok(members.len())
}

fn get_in(conn: &Connection, id: i64) -> Result<Option<ParticipantRecord>, StoreError> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM participants WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], record_from_row).optional()?)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ParticipantRecord> {
    let role: String = row.get(10)?;
    Ok(ParticipantRecord {
        id: row.get(0)?,
        roll_no: row.get(1)?,
        name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        department: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        year: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        event: row.get(5)?,
        source: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        cert_url: row.get(7)?,
        generating: row.get(8)?,
        blocked: row.get(9)?,
        member_role: MemberRole::parse(&role).unwrap_or(MemberRole::Leader),
        leader_roll_no: row.get(11)?,
        member_position: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn count(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}
