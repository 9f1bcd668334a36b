//! Stats command - per-event issuance totals and department breakdown.

use anyhow::Result;
use owo_colors::OwoColorize;

use markus_core::roll::display_event_name;

use crate::commands::{open_store, print_json};
use crate::{Config, OutputFormat};

/// Execute the stats command.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn execute(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let (stats, departments) = store
        .run(|s| Ok((s.event_stats()?, s.department_breakdown()?)))
        .await?;

    match config.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "events": stats,
            "departments": departments,
        }))?,
        OutputFormat::Text => {
            if stats.is_empty() {
                println!("No records yet");
                return Ok(());
            }
            for event in &stats {
                println!(
                    "{}: {} issued, {} pending, {} blocked ({} records)",
                    display_event_name(&event.event).bold(),
                    event.issued.green(),
                    event.pending.yellow(),
                    event.blocked.red(),
                    event.records
                );
            }
            println!();
            for department in &departments {
                println!(
                    "{}: {}",
                    department.department.bold(),
                    department.participants
                );
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct StatsRow {
                #[tabled(rename = "Event")]
                event: String,
                #[tabled(rename = "Records")]
                records: u64,
                #[tabled(rename = "Issued")]
                issued: u64,
                #[tabled(rename = "Pending")]
                pending: u64,
                #[tabled(rename = "Blocked")]
                blocked: u64,
            }

            let rows: Vec<_> = stats
                .iter()
                .map(|s| StatsRow {
                    event: display_event_name(&s.event),
                    records: s.records,
                    issued: s.issued,
                    pending: s.pending,
                    blocked: s.blocked,
                })
                .collect();
            println!("{}", Table::new(rows));

            #[derive(Tabled)]
            struct DepartmentRow {
                #[tabled(rename = "Department")]
                department: String,
                #[tabled(rename = "Participants")]
                participants: u64,
            }

            let rows: Vec<_> = departments
                .into_iter()
                .map(|d| DepartmentRow {
                    department: d.department,
                    participants: d.participants,
                })
                .collect();
            println!("{}", Table::new(rows));
        }
    }
    Ok(())
}
