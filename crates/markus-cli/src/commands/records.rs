//! Record commands - lookup, block and unblock.

use anyhow::{Result, bail};
use clap::Args;
use owo_colors::OwoColorize;

use markus_core::participant::{IssuanceState, ParticipantRecord, RecordFilter};
use markus_core::roll::normalize_roll;
use markus_core::store::ParticipantStore;

use crate::commands::{open_store, print_json};
use crate::{Config, OutputFormat};

/// Arguments for the lookup command.
#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Roll number, any case.
    pub roll_no: String,
}

/// Arguments naming one `(roll_no, event)` pair.
#[derive(Debug, Args)]
pub struct RecordKeyArgs {
    /// Roll number, any case.
    pub roll_no: String,
    /// Event key.
    pub event: String,
}

/// Execute the lookup command.
///
/// # Errors
///
/// Returns an error if the store cannot be read or no record matches.
pub async fn execute_lookup(args: LookupArgs, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let roll_no = normalize_roll(&args.roll_no);
    let filter = RecordFilter {
        event: None,
        roll_no: Some(roll_no.clone()),
    };
    let records = store.run(move |s| s.list_records(&filter)).await?;
    if records.is_empty() {
        bail!("no records for {roll_no}");
    }
    print_records(&records, config)
}

/// Execute the block or unblock command.
///
/// # Errors
///
/// Returns an error if the store cannot be updated or no record matches.
pub async fn execute_block(args: RecordKeyArgs, config: &Config, blocked: bool) -> Result<()> {
    let store = open_store(config)?;
    let roll_no = normalize_roll(&args.roll_no);
    let event = args.event.trim().to_string();
    let updated = store
        .run(move |s| Ok(set_blocked(s, &roll_no, &event, blocked)))
        .await??;
    tracing::info!(records = updated.len(), blocked, "visibility updated");
    print_records(&updated, config)
}

/// Sets the block flag on every record of `(roll_no, event)`, leader and
/// member rows alike.
///
/// # Errors
///
/// Returns an error if no record matches or an update fails.
pub fn set_blocked(
    store: &ParticipantStore,
    roll_no: &str,
    event: &str,
    blocked: bool,
) -> Result<Vec<ParticipantRecord>> {
    let filter = RecordFilter {
        event: Some(event.to_string()),
        roll_no: Some(roll_no.to_string()),
    };
    let records = store.list_records(&filter)?;
    if records.is_empty() {
        bail!("no record for {roll_no} in {event}");
    }
    records
        .iter()
        .map(|record| Ok(store.set_blocked(record.id, blocked)?))
        .collect()
}

fn print_records(records: &[ParticipantRecord], config: &Config) -> Result<()> {
    match config.format {
        OutputFormat::Json => print_json(records)?,
        OutputFormat::Text => {
            for record in records {
                println!(
                    "{} {} [{}] {} {}",
                    record.roll_no.bold(),
                    record.name,
                    record.member_role,
                    record.event,
                    format_state_colored(record.state())
                );
                if let Some(url) = &record.cert_url {
                    println!("    {}", url.dimmed());
                }
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct RecordRow {
                #[tabled(rename = "ID")]
                id: i64,
                #[tabled(rename = "Roll No")]
                roll_no: String,
                #[tabled(rename = "Name")]
                name: String,
                #[tabled(rename = "Event")]
                event: String,
                #[tabled(rename = "Role")]
                role: String,
                #[tabled(rename = "State")]
                state: String,
            }

            let rows: Vec<_> = records
                .iter()
                .map(|r| RecordRow {
                    id: r.id,
                    roll_no: r.roll_no.clone(),
                    name: r.name.clone(),
                    event: r.event.clone(),
                    role: r.member_role.to_string(),
                    state: r.state().to_string(),
                })
                .collect();
            println!("{}", Table::new(rows));
        }
    }
    Ok(())
}

fn format_state_colored(state: IssuanceState) -> String {
    let label = state.as_str();
    match state {
        IssuanceState::Issued => label.green().to_string(),
        IssuanceState::Suppressed => label.red().to_string(),
        IssuanceState::Claimed => label.blue().to_string(),
        IssuanceState::Unissued => label.yellow().to_string(),
    }
}
