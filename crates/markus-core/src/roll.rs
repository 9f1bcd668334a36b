//! Roll-number, cohort and label normalization rules.

use std::borrow::Cow;

/// Minimum accepted length of a normalized roll number.
pub const MIN_ROLL_LEN: usize = 5;

/// Prefix stripped from raw event sheet titles for display.
const EVENT_TITLE_PREFIX: &str = "MARKUS 2K26 - ";

/// Suffix Google Forms appends to response sheet titles.
const EVENT_TITLE_SUFFIX: &str = "(Responses)";

/// Batch prefix to cohort mapping for the current academic year.
const COHORTS: &[(&str, &str)] = &[("25", "I"), ("24", "II"), ("23", "III"), ("22", "IV")];

/// Normalizes a roll number: trimmed and uppercased.
#[must_use]
pub fn normalize_roll(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Returns true if a normalized roll number is long enough to be accepted.
#[must_use]
pub fn is_acceptable_roll(roll_no: &str) -> bool {
    !roll_no.is_empty() && roll_no.chars().count() >= MIN_ROLL_LEN
}

/// Derives the cohort from the two-digit batch prefix of a roll number.
///
/// Unknown prefixes yield `None`.
#[must_use]
pub fn cohort_from_roll(roll_no: &str) -> Option<&'static str> {
    let prefix = roll_no.get(..2)?;
    COHORTS
        .iter()
        .find(|(batch, _)| *batch == prefix)
        .map(|(_, cohort)| *cohort)
}

/// Resolves a year: an explicit non-empty value wins, else the roll prefix.
#[must_use]
pub fn resolve_year(explicit: &str, roll_no: &str) -> String {
    let explicit = explicit.trim();
    if explicit.is_empty() {
        cohort_from_roll(roll_no).unwrap_or_default().to_string()
    } else {
        explicit.to_string()
    }
}

/// Maps a bare digit year (1-4) to its roman numeral; anything else is
/// returned unchanged.
#[must_use]
pub fn roman_year(year: &str) -> Cow<'_, str> {
    match year.trim() {
        "1" => Cow::Borrowed("I"),
        "2" => Cow::Borrowed("II"),
        "3" => Cow::Borrowed("III"),
        "4" => Cow::Borrowed("IV"),
        _ => Cow::Borrowed(year),
    }
}

/// Cleans a raw sheet/event title for display.
///
/// Drops the `MARKUS 2K26 - ` prefix and the `(Responses)` suffix and
/// collapses whitespace runs.
#[must_use]
pub fn display_event_name(event: &str) -> String {
    let cleaned = event
        .replace(EVENT_TITLE_PREFIX, "")
        .replace(EVENT_TITLE_SUFFIX, "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a free-text department to a canonical name for reporting.
///
/// Known abbreviations map to a canonical name; everything else is
/// title-cased. Empty input yields `"Other"`.
#[must_use]
pub fn normalize_department(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Other".to_string();
    }

    let key: String = trimmed
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '&')
        .collect();

    let canonical = match key.as_str() {
        "MSCIS&R" | "MSCISR" | "IS&R" | "ISR" => Some("MSc Information Science"),
        "MSCIT" => Some("MSc Information Technology"),
        "MSCSS" => Some("MSc Software Systems"),
        "MSCCT" => Some("MSc Computer Technology"),
        "MSCDS" => Some("MSc Data Science"),
        "BSC" => Some("BSc"),
        "BSCCT" => Some("BSc Computer Technology"),
        "BSCIT" => Some("BSc Information Technology"),
        "MCA" => Some("MCA"),
        "CSE" | "COMPUTERSCIENCE" | "COMPUTERSCIENCEANDENGINEERING" => Some("Computer Science"),
        "CSD" => Some("Computer Science & Design"),
        "CSBS" => Some("Computer Science & Business Systems"),
        "ECE" | "ELECTRONICS" | "ELECTRONICSANDCOMMUNICATION" => {
            Some("Electronics & Communication")
        }
        "EIE" | "ELECTRONICSANDINSTRUMENTATION" => Some("Electronics & Instrumentation"),
        "EEE" | "ELECTRICAL" | "ELECTRICALANDELECTRONICS" => Some("Electrical Engineering"),
        "MECH" | "MECHANICAL" | "MECHANICALENGINEERING" => Some("Mechanical"),
        "AUTO" | "AUTOMOBILE" | "AUTOMOBILEENGINEERING" => Some("Automobile Engineering"),
        "CIVIL" | "CIVILENGINEERING" => Some("Civil"),
        "IT" | "INFORMATIONTECHNOLOGY" => Some("Information Technology"),
        "AI" => Some("Artificial Intelligence"),
        "AIDS" | "AI&DS" => Some("AI & Data Science"),
        "AIML" | "AI&ML" => Some("AI & Machine Learning"),
        "CY" | "CYBER" | "CYBERSECURITY" => Some("Cyber Security"),
        "MBA" => Some("Business Administration"),
        "CHEMICAL" | "CHEMICALENGINEERING" => Some("Chemical Engineering"),
        "FT" | "FOODTECH" | "FOODTECHNOLOGY" => Some("Food Technology"),
        "BT" | "BIOTECH" | "BIOTECHNOLOGY" => Some("Biotechnology"),
        "TEXTILE" | "TEXTILETECHNOLOGY" => Some("Textile Technology"),
        "FASHION" | "FASHIONTECHNOLOGY" => Some("Fashion Technology"),
        _ => None,
    };

    canonical.map_or_else(|| title_case(trimmed), str::to_string)
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
