// Field checks applied before rows are written

use anyhow::{bail, Result};

/// Reject values longer than `max` characters
pub(crate) fn max_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        bail!("{} must be at most {} characters (got {})", field, max, len);
    }
    Ok(())
}

/// Reject empty or whitespace-only values, then apply the length limit
pub(crate) fn required(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{} must not be empty", field);
    }
    max_len(field, value, max)
}
