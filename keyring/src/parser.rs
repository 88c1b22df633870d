use std::path::Path;

use log::{debug, info, warn};
use snafu::ResultExt;

use crate::error::{ParseError, ReadDumpSnafu};
use crate::record::{KeyField, KeyRecord};

/// Width of the label column printed in front of every value.
pub const LABEL_WIDTH: usize = 21;

/// Number of lines that make up one record.
pub const GROUP_LINES: usize = KeyField::ALL.len();

/// How strictly each line of a group is checked before its value is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelPolicy {
    /// The label column must name the field expected at that offset,
    /// otherwise the whole group is rejected.
    #[default]
    Labeled,
    /// Values are assigned by offset alone and the label column is ignored.
    Positional,
}

/// A group that was not turned into a record because a label did not match its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRejection {
    /// Zero-based index of the group in the dump.
    pub group: usize,
    /// One-based line number of the offending line.
    pub line: usize,
    /// The field expected at that line.
    pub expected: KeyField,
    /// The label text that was found instead.
    pub found: String,
}

/// The result of parsing a dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDump {
    /// Records in file order, including invalid ones.
    pub records: Vec<KeyRecord>,
    /// Groups refused under [`LabelPolicy::Labeled`].
    pub rejected: Vec<GroupRejection>,
    /// Number of trailing lines that did not fill a complete group.
    pub discarded_lines: usize,
}

impl ParsedDump {
    /// Records that carry every field.
    pub fn valid_records(&self) -> impl Iterator<Item = &KeyRecord> {
        self.records.iter().filter(|record| record.is_valid())
    }
}

/// Splits a line into its trimmed label column and trimmed value.
///
/// The label column is the first [`LABEL_WIDTH`] characters; shorter lines have an empty value.
fn split_line(line: &str) -> (&str, &str) {
    let split = line
        .char_indices()
        .nth(LABEL_WIDTH)
        .map(|(index, _)| index)
        .unwrap_or(line.len());
    let (label, value) = line.split_at(split);
    (label.trim(), value.trim())
}

/// Builds one record out of a complete group of lines.
fn parse_group(
    group: usize,
    lines: &[&str],
    policy: LabelPolicy,
) -> Result<KeyRecord, GroupRejection> {
    let mut values: [String; GROUP_LINES] = Default::default();

    for (offset, (line, field)) in lines.iter().zip(KeyField::ALL).enumerate() {
        let (label, value) = split_line(line);

        if policy == LabelPolicy::Labeled && !label.eq_ignore_ascii_case(field.label()) {
            return Err(GroupRejection {
                group,
                line: group * GROUP_LINES + offset + 1,
                expected: field,
                found: label.to_string(),
            });
        }

        values[offset] = value.to_string();
    }

    Ok(KeyRecord::from_values(values))
}

/// Parses dump text into records.
///
/// Lines are grouped six at a time in file order. A trailing partial group is discarded.
/// This never fails: incomplete records are kept and flagged through
/// [`KeyRecord::is_valid`], label mismatches are reported in [`ParsedDump::rejected`].
pub fn parse_dump(text: &str, policy: LabelPolicy) -> ParsedDump {
    let lines: Vec<&str> = text.lines().collect();
    let mut groups = lines.chunks_exact(GROUP_LINES);
    let mut parsed = ParsedDump::default();

    for (group, chunk) in (&mut groups).enumerate() {
        match parse_group(group, chunk, policy) {
            Ok(record) => {
                if !record.is_valid() {
                    warn!(
                        "⚠️ Key record {} is missing fields: {:?}",
                        group,
                        record.missing_fields()
                    );
                }
                parsed.records.push(record);
            }
            Err(rejection) => {
                warn!(
                    "⚠️ Rejecting key group {}: line {} should be '{}' but found '{}'",
                    rejection.group, rejection.line, rejection.expected, rejection.found
                );
                parsed.rejected.push(rejection);
            }
        }
    }

    parsed.discarded_lines = groups.remainder().len();
    if parsed.discarded_lines > 0 {
        debug!(
            "Ignoring {} trailing lines that do not form a complete key group",
            parsed.discarded_lines
        );
    }

    parsed
}

/// Reads a dump file and parses it with [`parse_dump`].
pub async fn load_dump(path: impl AsRef<Path>, policy: LabelPolicy) -> Result<ParsedDump, ParseError> {
    let path = path.as_ref();
    info!("Reading key dump: {}", path.display());

    let text = tokio::fs::read_to_string(path).await.context(ReadDumpSnafu {
        path: path.display().to_string(),
    })?;

    let parsed = parse_dump(&text, policy);
    info!(
        "🔑 Parsed {} key records ({} rejected groups)",
        parsed.records.len(),
        parsed.rejected.len()
    );

    Ok(parsed)
}
