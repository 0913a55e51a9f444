use crate::devops::{DiffPayload, GatewayError};

/// Line counters derived from a pull request diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub total_changes: u64,
}

impl DiffStats {
    /// Derive counters from a diff payload.
    ///
    /// A provider summary wins and is taken as-is; the file list is only
    /// consulted when no summary is present. A summary without a total gets
    /// added + deleted. Counts that do not fit in a `u64` are a malformed
    /// response.
    pub fn from_payload(payload: &DiffPayload) -> Result<DiffStats, GatewayError> {
        if let Some(summary) = &payload.summary {
            let total_changes = match summary.total_changes {
                Some(total) => total,
                None => checked_total(summary.lines_added, summary.lines_deleted)?,
            };
            return Ok(DiffStats {
                lines_added: summary.lines_added,
                lines_deleted: summary.lines_deleted,
                total_changes,
            });
        }

        let (lines_added, lines_deleted) = payload
            .files
            .iter()
            .try_fold((0u64, 0u64), |(added, deleted), file| {
                Some((
                    added.checked_add(file.lines_added)?,
                    deleted.checked_add(file.lines_deleted)?,
                ))
            })
            .ok_or_else(overflow)?;
        Ok(DiffStats {
            lines_added,
            lines_deleted,
            total_changes: checked_total(lines_added, lines_deleted)?,
        })
    }
}

fn checked_total(added: u64, deleted: u64) -> Result<u64, GatewayError> {
    added.checked_add(deleted).ok_or_else(overflow)
}

fn overflow() -> GatewayError {
    GatewayError::malformed("get_commit_diff", "line counts overflow")
}
