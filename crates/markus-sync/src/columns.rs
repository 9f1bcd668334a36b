//! Fuzzy header detection.
//!
//! Registration forms differ per event ("Roll no", "Team Leader Roll no (eg :
//! 23XXX001)", "Registration Number", ...). Columns are found by matching
//! lowercase header text against keyword lists: headers are scanned left to
//! right and the first usable header containing any keyword wins.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Exact header names that bypass keyword matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinnedColumns {
    /// Roll-number header.
    pub roll: Option<String>,
    /// Name header.
    pub name: Option<String>,
    /// Department header.
    pub department: Option<String>,
    /// Year header.
    pub year: Option<String>,
}

/// Column-detection policy for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnPolicy {
    /// Roll-number keywords.
    pub roll: Vec<String>,
    /// Name keywords.
    pub name: Vec<String>,
    /// Department keywords.
    pub department: Vec<String>,
    /// Year/cohort keywords.
    pub year: Vec<String>,
    /// Headers containing any of these are never primary columns.
    pub exclude: Vec<String>,
    /// Exact header overrides.
    pub pinned: PinnedColumns,
    /// Whether to read paired team-member columns.
    pub team_members: bool,
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

impl Default for ColumnPolicy {
    fn default() -> Self {
        Self {
            roll: keywords(&["roll no", "roll", "reg", "registration", "leader roll"]),
            name: keywords(&[
                "name with initial",
                "name",
                "student name",
                "full name",
                "leader name",
            ]),
            department: keywords(&["department", "dept", "branch"]),
            year: keywords(&["year", "yr", "batch"]),
            exclude: keywords(&["team name", "file", "email"]),
            pinned: PinnedColumns::default(),
            team_members: true,
        }
    }
}

/// Paired name/roll columns for one team-member slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberColumns {
    /// Numeric suffix from the header ("member 2" → 2).
    pub slot: u32,
    /// Index of the member name column.
    pub name: usize,
    /// Index of the member roll column.
    pub roll: usize,
}

/// Detected column indices for one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Leader roll-number column.
    pub roll: usize,
    /// Leader name column.
    pub name: Option<usize>,
    /// Department column.
    pub department: Option<usize>,
    /// Year column.
    pub year: Option<usize>,
    /// Team-member slots ordered by suffix.
    pub members: Vec<MemberColumns>,
}

fn member_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"member\s*(\d+)").expect("invalid member header pattern"))
}

/// Finds team-member column pairs.
///
/// A header mentioning `member <n>` belongs to slot `n`; within a slot the
/// header containing `name` is paired with the one containing `roll` or
/// `reg`. Slots missing either half are dropped.
#[must_use]
pub fn detect_member_columns(headers: &[String]) -> Vec<MemberColumns> {
    let mut slots: BTreeMap<u32, (Option<usize>, Option<usize>)> = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let lower = header.to_lowercase();
        let Some(slot) = member_pattern()
            .captures(&lower)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        else {
            continue;
        };
        let entry = slots.entry(slot).or_default();
        if lower.contains("name") {
            entry.0.get_or_insert(idx);
        } else if lower.contains("roll") || lower.contains("reg") {
            entry.1.get_or_insert(idx);
        }
    }

    slots
        .into_iter()
        .filter_map(|(slot, pair)| match pair {
            (Some(name), Some(roll)) => Some(MemberColumns { slot, name, roll }),
            _ => None,
        })
        .collect()
}

/// Indices of every header that mentions a member slot.
fn member_header_indices(headers: &[String]) -> HashSet<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| member_pattern().is_match(&h.to_lowercase()))
        .map(|(idx, _)| idx)
        .collect()
}

fn find_pinned(headers: &[String], pinned: Option<&String>) -> Option<usize> {
    let wanted = pinned?.trim().to_lowercase();
    headers
        .iter()
        .position(|h| h.trim().to_lowercase() == wanted)
}

fn find_by_keywords(
    headers: &[String],
    keywords: &[String],
    exclude: &[String],
    taken: &HashSet<usize>,
) -> Option<usize> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let exclude: Vec<String> = exclude.iter().map(|e| e.to_lowercase()).collect();
    headers.iter().enumerate().find_map(|(idx, header)| {
        let header = header.trim().to_lowercase();
        let usable = !taken.contains(&idx) && !exclude.iter().any(|ex| header.contains(ex));
        (usable && keywords.iter().any(|keyword| header.contains(keyword))).then_some(idx)
    })
}

/// Detects the column layout of a sheet.
///
/// Returns `None` when no roll-number column can be found; such a sheet
/// cannot produce records.
#[must_use]
pub fn detect_columns(headers: &[String], policy: &ColumnPolicy) -> Option<ColumnLayout> {
    let mut taken = if policy.team_members {
        member_header_indices(headers)
    } else {
        HashSet::new()
    };

    let mut pick = |pinned: Option<&String>, keywords: &[String]| {
        let found = find_pinned(headers, pinned)
            .or_else(|| find_by_keywords(headers, keywords, &policy.exclude, &taken));
        if let Some(idx) = found {
            taken.insert(idx);
        }
        found
    };

    let roll = pick(policy.pinned.roll.as_ref(), &policy.roll)?;
    let name = pick(policy.pinned.name.as_ref(), &policy.name);
    let department = pick(policy.pinned.department.as_ref(), &policy.department);
    let year = pick(policy.pinned.year.as_ref(), &policy.year);

    let members = if policy.team_members {
        detect_member_columns(headers)
    } else {
        Vec::new()
    };

    Some(ColumnLayout {
        roll,
        name,
        department,
        year,
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn detects_simple_individual_form() {
        let h = headers(&["Timestamp", "Name", "Roll No", "Department", "Year"]);
        let layout = detect_columns(&h, &ColumnPolicy::default()).expect("layout");
        assert_eq!(layout.roll, 2);
        assert_eq!(layout.name, Some(1));
        assert_eq!(layout.department, Some(3));
        assert_eq!(layout.year, Some(4));
        assert!(layout.members.is_empty());
    }

    #[test]
    fn leftmost_matching_header_wins() {
        let h = headers(&["Registration Number", "Roll No"]);
        let layout = detect_columns(&h, &ColumnPolicy::default()).expect("layout");
        assert_eq!(layout.roll, 0);

        let h = headers(&["Roll No", "Student Name", "Name with Initial"]);
        let layout = detect_columns(&h, &ColumnPolicy::default()).expect("layout");
        assert_eq!(layout.roll, 0);
        assert_eq!(layout.name, Some(1));
    }

    #[test]
    fn taken_and_excluded_headers_are_skipped() {
        let h = headers(&["Team Name", "Name", "Name with Initial"]);
        let mut policy = ColumnPolicy::default();
        policy.pinned.roll = Some("Name".to_string());
        let layout = detect_columns(&h, &policy).expect("layout");
        assert_eq!(layout.roll, 1);
        assert_eq!(layout.name, Some(2));
    }

    #[test]
    fn team_form_pairs_member_columns_and_keeps_them_out_of_primary() {
        let h = headers(&[
            "Timestamp",
            "Team Name",
            "Team member 1 Name",
            "Team member 1 Roll number (eg:23XXX001)",
            "Team Leader Name",
            "Team Leader Roll no (eg : 23XXX001)",
            "Department",
            "Team member 2 Name",
            "Team member 2 Roll number (eg:23XXX001)",
        ]);
        let layout = detect_columns(&h, &ColumnPolicy::default()).expect("layout");
        assert_eq!(layout.roll, 5);
        assert_eq!(layout.name, Some(4));
        assert_eq!(layout.department, Some(6));
        assert_eq!(layout.year, None);
        assert_eq!(
            layout.members,
            vec![
                MemberColumns { slot: 1, name: 2, roll: 3 },
                MemberColumns { slot: 2, name: 7, roll: 8 },
            ]
        );
    }

    #[test]
    fn incomplete_member_slots_are_dropped() {
        let h = headers(&[
            "Roll no",
            "Team Member 2 Roll.no  (eg : 23XXX001)",
            "Team Member 3 Name",
            "Team Member 3 Reg No",
        ]);
        let members = detect_member_columns(&h);
        assert_eq!(members, vec![MemberColumns { slot: 3, name: 2, roll: 3 }]);
    }

    #[test]
    fn missing_roll_column_yields_none() {
        let h = headers(&["Timestamp", "Name", "Department"]);
        assert!(detect_columns(&h, &ColumnPolicy::default()).is_none());
    }

    #[test]
    fn pinned_header_wins() {
        let h = headers(&["Roll No", "Official Roll"]);
        let mut policy = ColumnPolicy::default();
        policy.pinned.roll = Some("official roll".to_string());
        let layout = detect_columns(&h, &policy).expect("layout");
        assert_eq!(layout.roll, 1);
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: ColumnPolicy =
            serde_json::from_str(r#"{ "year": ["semester"] }"#).expect("parse");
        assert_eq!(policy.year, vec!["semester".to_string()]);
        assert_eq!(policy.roll, ColumnPolicy::default().roll);
        assert!(policy.team_members);
    }
}
