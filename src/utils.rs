use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Byte progress bar over `total` bytes, or `None` when progress is disabled.
pub fn progress_bar(total: u64, no_progress: bool) -> Option<ProgressBar> {
    if no_progress {
        return None;
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}",
    )
    .map(|s| s.progress_chars("##-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message("Hashing...");
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

pub fn size_to_human_readable(size: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = size;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

/// `h:mm:ss.mmm`
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        elapsed.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_readable_sizes() {
        assert_eq!(size_to_human_readable(512.0), "512.00 B");
        assert_eq!(size_to_human_readable(5.0 * 1024.0 * 1024.0), "5.00 MiB");
    }

    #[test]
    fn duration_format() {
        assert_eq!(format_duration(Duration::from_millis(3_723_045)), "1:02:03.045");
    }
}
