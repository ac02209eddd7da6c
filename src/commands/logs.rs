//! Print the tail of the newest log file.

use crate::logging;
use std::fs;

const DEFAULT_LINES: usize = 50;

/// Shows the last lines of the most recent wfall log.
///
/// # Errors
/// - If the log directory cannot be determined
/// - If the log file cannot be read
pub fn handle_logs() -> anyhow::Result<()> {
    let log_dir = logging::log_dir()?;

    if !log_dir.exists() {
        println!("Log directory does not exist yet: {}", log_dir.display());
        println!("Logs will be created when wfall runs.");
        return Ok(());
    }

    let Some(log_file) = logging::rotated_logs(&log_dir)?.into_iter().next() else {
        println!("No log files found in: {}", log_dir.display());
        return Ok(());
    };

    let content = fs::read_to_string(&log_file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", log_file.display()))?;
    if content.is_empty() {
        println!("Log file is empty: {}", log_file.display());
        return Ok(());
    }

    let (shown, total) = tail(&content, DEFAULT_LINES);
    if shown.len() < total {
        println!("Showing last {} of {} lines:", shown.len(), total);
    } else {
        println!("Showing all {total} lines:");
    }
    println!("Full log file at: {}", log_file.display());
    println!();
    for line in shown {
        println!("{line}");
    }

    Ok(())
}

/// Last `count` lines of `content`, plus the total line count.
fn tail(content: &str, count: usize) -> (Vec<&str>, usize) {
    let lines: Vec<&str> = content.lines().collect();
    let total = lines.len();
    let shown = lines[total.saturating_sub(count)..].to_vec();
    (shown, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_limits_lines() {
        let content: String = (0..60).map(|i| format!("line {i}\n")).collect();
        let (shown, total) = tail(&content, 50);
        assert_eq!(total, 60);
        assert_eq!(shown.len(), 50);
        assert_eq!(shown[0], "line 10");
        assert_eq!(shown[49], "line 59");
    }

    #[test]
    fn test_tail_short_file() {
        let (shown, total) = tail("a\nb\n", 50);
        assert_eq!((shown, total), (vec!["a", "b"], 2));
    }
}
