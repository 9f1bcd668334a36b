//! End-to-end sync passes against a temporary store.

use std::sync::Arc;

use anyhow::{Context, Result};
use markus_core::participant::{MemberRole, RecordFilter};
use markus_core::store::ParticipantStore;
use markus_sync::source::{SourceConfig, StaticSheetSource};
use markus_sync::synchronizer::{SourceOutcome, Synchronizer};
use tempfile::TempDir;

const TEAM_HEADERS: &[&str] = &[
    "Timestamp",
    "Team Name",
    "Team Leader Name",
    "Team Leader Roll no (eg : 23XXX001)",
    "Department",
    "Year",
    "Team member 1 Name",
    "Team member 1 Roll number (eg:23XXX001)",
    "Team member 2 Name",
    "Team member 2 Roll number (eg:23XXX001)",
];

fn open_store() -> Result<(TempDir, ParticipantStore)> {
    let dir = TempDir::new().context("tempdir")?;
    let store = ParticipantStore::open(dir.path().join("participants.db")).context("open store")?;
    Ok((dir, store))
}

fn synchronizer(store: &ParticipantStore, fetcher: StaticSheetSource) -> Synchronizer {
    Synchronizer::new(
        store.clone(),
        Arc::new(fetcher),
        vec![SourceConfig::new("hackathon", "HACKATHON")],
    )
}

#[tokio::test]
async fn leader_with_member_and_derived_year() -> Result<()> {
    let (_dir, store) = open_store()?;
    let fetcher = StaticSheetSource::new().with_sheet(
        "hackathon",
        &[
            TEAM_HEADERS,
            &["t", "Team", "A B", "23CS001", "CSE", "", "C D", "23CS002", "", ""],
        ],
    );
    synchronizer(&store, fetcher).run().await;

    let leader = store
        .find_record("23CS001", "HACKATHON")?
        .context("leader missing")?;
    assert_eq!(leader.name, "A B");
    assert_eq!(leader.year, "III");
    assert_eq!(leader.member_role, MemberRole::Leader);
    assert_eq!(leader.member_position, 0);

    let member = store
        .find_record("23CS002", "HACKATHON")?
        .context("member missing")?;
    assert_eq!(member.name, "C D");
    assert_eq!(member.member_role, MemberRole::Member);
    assert_eq!(member.leader_roll_no.as_deref(), Some("23CS001"));
    assert_eq!(member.member_position, 1);
    assert_eq!(member.department, "CSE");
    assert_eq!(member.year, "III");
    Ok(())
}

#[tokio::test]
async fn repeated_sync_is_idempotent() -> Result<()> {
    let (_dir, store) = open_store()?;
    let fetcher = StaticSheetSource::new().with_sheet(
        "hackathon",
        &[
            TEAM_HEADERS,
            &["t", "T1", "A", "23CS001", "CSE", "", "B", "23CS002", "C", "23CS003"],
            &["t", "T2", "D", "24IT001", "IT", "2", "", "", "", ""],
        ],
    );
    let sync = synchronizer(&store, fetcher);

    sync.run().await;
    let first = store.list_records(&RecordFilter::default())?;
    let report = sync.run().await;
    let second = store.list_records(&RecordFilter::default())?;

    assert_eq!(first.len(), 4);
    let strip = |records: &[markus_core::participant::ParticipantRecord]| {
        records
            .iter()
            .map(|r| (r.roll_no.clone(), r.member_role, r.member_position, r.year.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first), strip(&second));
    assert_eq!(report.totals().leaders_inserted, 0);
    Ok(())
}

#[tokio::test]
async fn sync_never_clears_issued_certificates() -> Result<()> {
    let (_dir, store) = open_store()?;
    let mut fetcher = StaticSheetSource::new();
    fetcher.insert(
        "hackathon",
        &[
            TEAM_HEADERS,
            &["t", "T1", "A", "23CS001", "CSE", "", "B", "23CS002", "", ""],
        ],
    );
    synchronizer(&store, fetcher.clone()).run().await;

    for roll in ["23CS001", "23CS002"] {
        let record = store.find_record(roll, "HACKATHON")?.context("record")?;
        assert!(store.try_claim(record.id)?);
        store.complete_claim(record.id, roll, "HACKATHON", &format!("memory://{roll}"))?;
    }

    // Leader renamed, member unchanged: both keep their URL.
    fetcher.insert(
        "hackathon",
        &[
            TEAM_HEADERS,
            &["t", "T1", "A Renamed", "23CS001", "CSE", "", "B", "23CS002", "", ""],
        ],
    );
    synchronizer(&store, fetcher).run().await;

    let leader = store.find_record("23CS001", "HACKATHON")?.context("leader")?;
    assert_eq!(leader.name, "A RENAMED");
    assert_eq!(leader.cert_url.as_deref(), Some("memory://23CS001"));
    let member = store.find_record("23CS002", "HACKATHON")?.context("member")?;
    assert_eq!(member.cert_url.as_deref(), Some("memory://23CS002"));
    Ok(())
}

#[tokio::test]
async fn duplicate_member_roll_is_suppressed() -> Result<()> {
    let (_dir, store) = open_store()?;
    let fetcher = StaticSheetSource::new().with_sheet(
        "hackathon",
        &[
            TEAM_HEADERS,
            &["t", "T1", "A", "23CS001", "CSE", "", "B", "23CS001", "C", "23CS003"],
        ],
    );
    let report = synchronizer(&store, fetcher).run().await;

    let records = store.list_records(&RecordFilter {
        event: Some("HACKATHON".to_string()),
        roll_no: None,
    })?;
    let rolls: Vec<&str> = records.iter().map(|r| r.roll_no.as_str()).collect();
    assert_eq!(rolls, vec!["23CS001", "23CS003"]);
    assert_eq!(records[1].member_position, 1);
    assert_eq!(report.totals().rejected_members, 1);
    Ok(())
}

#[tokio::test]
async fn failing_source_is_skipped_and_pass_continues() -> Result<()> {
    let (_dir, store) = open_store()?;
    let fetcher = StaticSheetSource::new()
        .with_sheet("quiz", &[&["Roll No", "Name", "Dept"], &["22ME010", "z", "Mech"]]);
    let sync = Synchronizer::new(
        store.clone(),
        Arc::new(fetcher),
        vec![
            SourceConfig::new("missing", "PAPER"),
            SourceConfig::new("quiz", "QUIZ"),
        ],
    );

    let report = sync.run().await;
    assert!(matches!(report.sources[0].outcome, SourceOutcome::Failed { .. }));
    assert!(matches!(report.sources[1].outcome, SourceOutcome::Synced(_)));

    let record = store.find_record("22ME010", "QUIZ")?.context("record")?;
    assert_eq!(record.year, "IV");
    assert_eq!(record.source, "quiz");
    Ok(())
}

#[tokio::test]
async fn removed_member_disappears_on_next_sync() -> Result<()> {
    let (_dir, store) = open_store()?;
    let mut fetcher = StaticSheetSource::new();
    fetcher.insert(
        "hackathon",
        &[
            TEAM_HEADERS,
            &["t", "T1", "A", "23CS001", "CSE", "", "B", "23CS002", "C", "23CS003"],
        ],
    );
    synchronizer(&store, fetcher.clone()).run().await;
    assert!(store.find_record("23CS003", "HACKATHON")?.is_some());

    fetcher.insert(
        "hackathon",
        &[
            TEAM_HEADERS,
            &["t", "T1", "A", "23CS001", "CSE", "", "B", "23CS002", "", ""],
        ],
    );
    synchronizer(&store, fetcher).run().await;
    assert!(store.find_record("23CS003", "HACKATHON")?.is_none());
    assert!(store.find_record("23CS002", "HACKATHON")?.is_some());
    Ok(())
}
