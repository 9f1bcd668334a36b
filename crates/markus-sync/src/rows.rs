//! Row acceptance: turns one sheet row into a leader plus accepted members.

use std::collections::HashSet;

use markus_core::participant::{Entrant, TeamEntry};
use markus_core::roll::{is_acceptable_roll, normalize_roll, resolve_year};

use crate::columns::ColumnLayout;

/// Why a whole row was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The leader roll cell is empty.
    MissingRoll,
    /// The leader roll is shorter than the minimum length.
    ShortRoll,
}

/// Why a team-member slot did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRejection {
    /// Name cell empty while a roll was given.
    MissingName {
        /// Member slot.
        slot: u32,
    },
    /// Roll cell empty while a name was given.
    MissingRoll {
        /// Member slot.
        slot: u32,
    },
    /// Roll number shorter than the minimum length.
    ShortRoll {
        /// Member slot.
        slot: u32,
    },
    /// Roll number already used by the leader or an earlier member.
    DuplicateRoll {
        /// Member slot.
        slot: u32,
        /// The duplicated roll number.
        roll_no: String,
    },
}

/// Outcome of reading one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDecision {
    /// The row produced a team entry; some members may have been rejected.
    Accepted {
        /// Leader plus accepted members.
        entry: TeamEntry,
        /// Member slots that were filled in but rejected.
        rejected: Vec<MemberRejection>,
    },
    /// The row was skipped entirely.
    Skipped(SkipReason),
}

fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map_or("", |v| v.trim())
}

/// Reads one data row against a detected layout.
///
/// Names are uppercased, roll numbers normalized. A missing year is derived
/// from the roll prefix; members always derive theirs. Members share the
/// row's department. Member slots with both cells blank are ignored
/// silently.
#[must_use]
pub fn read_row(row: &[String], layout: &ColumnLayout, event: &str, source: &str) -> RowDecision {
    let roll_no = normalize_roll(cell(row, Some(layout.roll)));
    if roll_no.is_empty() {
        return RowDecision::Skipped(SkipReason::MissingRoll);
    }
    if !is_acceptable_roll(&roll_no) {
        return RowDecision::Skipped(SkipReason::ShortRoll);
    }

    let department = cell(row, layout.department).to_string();
    let leader = Entrant {
        name: cell(row, layout.name).to_uppercase(),
        year: resolve_year(cell(row, layout.year), &roll_no),
        department: department.clone(),
        roll_no,
    };

    let mut claimed: HashSet<String> = HashSet::from([leader.roll_no.clone()]);
    let mut members = Vec::new();
    let mut rejected = Vec::new();

    for slot in &layout.members {
        let name = cell(row, Some(slot.name)).to_uppercase();
        let member_roll = normalize_roll(cell(row, Some(slot.roll)));

        let rejection = match (name.is_empty(), member_roll.is_empty()) {
            (true, true) => continue,
            (true, false) => Some(MemberRejection::MissingName { slot: slot.slot }),
            (false, true) => Some(MemberRejection::MissingRoll { slot: slot.slot }),
            (false, false) if !is_acceptable_roll(&member_roll) => {
                Some(MemberRejection::ShortRoll { slot: slot.slot })
            }
            (false, false) if claimed.contains(&member_roll) => {
                Some(MemberRejection::DuplicateRoll {
                    slot: slot.slot,
                    roll_no: member_roll.clone(),
                })
            }
            (false, false) => None,
        };

        if let Some(rejection) = rejection {
            tracing::debug!(event, ?rejection, "team member rejected");
            rejected.push(rejection);
            continue;
        }

        claimed.insert(member_roll.clone());
        members.push(Entrant {
            year: resolve_year("", &member_roll),
            roll_no: member_roll,
            name,
            department: department.clone(),
        });
    }

    RowDecision::Accepted {
        entry: TeamEntry {
            event: event.to_string(),
            source: source.to_string(),
            leader,
            members,
        },
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::MemberColumns;

    fn row(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn team_layout() -> ColumnLayout {
        // roll, name, dept, year, m1 name, m1 roll, m2 name, m2 roll
        ColumnLayout {
            roll: 0,
            name: Some(1),
            department: Some(2),
            year: Some(3),
            members: vec![
                MemberColumns { slot: 1, name: 4, roll: 5 },
                MemberColumns { slot: 2, name: 6, roll: 7 },
            ],
        }
    }

    fn accepted(decision: RowDecision) -> (TeamEntry, Vec<MemberRejection>) {
        match decision {
            RowDecision::Accepted { entry, rejected } => (entry, rejected),
            RowDecision::Skipped(reason) => panic!("row skipped: {reason:?}"),
        }
    }

    #[test]
    fn leader_and_member_with_derived_year() {
        let r = row(&["23cs001", "A B", "CSE", "", "C D", "23CS002", "", ""]);
        let (entry, rejected) = accepted(read_row(&r, &team_layout(), "EVENT", "sheet"));

        assert!(rejected.is_empty());
        assert_eq!(entry.leader.roll_no, "23CS001");
        assert_eq!(entry.leader.name, "A B");
        assert_eq!(entry.leader.year, "III");
        assert_eq!(entry.members.len(), 1);
        assert_eq!(entry.members[0].roll_no, "23CS002");
        assert_eq!(entry.members[0].name, "C D");
        assert_eq!(entry.members[0].department, "CSE");
    }

    #[test]
    fn explicit_year_is_kept() {
        let r = row(&["23CS001", "a b", "CSE", "II", "", "", "", ""]);
        let (entry, _) = accepted(read_row(&r, &team_layout(), "EVENT", "sheet"));
        assert_eq!(entry.leader.year, "II");
        assert_eq!(entry.leader.name, "A B");
    }

    #[test]
    fn short_or_missing_leader_roll_skips_row() {
        let layout = team_layout();
        assert_eq!(
            read_row(&row(&["", "A"]), &layout, "EVENT", "sheet"),
            RowDecision::Skipped(SkipReason::MissingRoll)
        );
        assert_eq!(
            read_row(&row(&[" 23CS ", "A"]), &layout, "EVENT", "sheet"),
            RowDecision::Skipped(SkipReason::ShortRoll)
        );
    }

    #[test]
    fn duplicate_member_rolls_are_suppressed() {
        let r = row(&[
            "23CS001", "A B", "CSE", "", "C D", "23cs001", "E F", "23CS003",
        ]);
        let (entry, rejected) = accepted(read_row(&r, &team_layout(), "EVENT", "sheet"));
        assert_eq!(entry.members.len(), 1);
        assert_eq!(entry.members[0].roll_no, "23CS003");
        assert_eq!(
            rejected,
            vec![MemberRejection::DuplicateRoll {
                slot: 1,
                roll_no: "23CS001".to_string()
            }]
        );

        let r = row(&[
            "23CS001", "A B", "CSE", "", "C D", "23CS002", "E F", "23CS002",
        ]);
        let (entry, rejected) = accepted(read_row(&r, &team_layout(), "EVENT", "sheet"));
        assert_eq!(entry.members.len(), 1);
        assert!(matches!(
            rejected.as_slice(),
            [MemberRejection::DuplicateRoll { slot: 2, .. }]
        ));
    }

    #[test]
    fn incomplete_members_are_rejected_and_blank_slots_ignored() {
        let r = row(&["23CS001", "A B", "CSE", "", "C D", "", "", "23C"]);
        let (entry, rejected) = accepted(read_row(&r, &team_layout(), "EVENT", "sheet"));
        assert!(entry.members.is_empty());
        assert_eq!(
            rejected,
            vec![
                MemberRejection::MissingRoll { slot: 1 },
                MemberRejection::MissingName { slot: 2 },
            ]
        );
    }

    #[test]
    fn short_rows_read_as_blank_cells() {
        let r = row(&["24IT010"]);
        let (entry, rejected) = accepted(read_row(&r, &team_layout(), "EVENT", "sheet"));
        assert_eq!(entry.leader.year, "II");
        assert_eq!(entry.leader.name, "");
        assert!(entry.members.is_empty());
        assert!(rejected.is_empty());
    }
}
