pub mod bar_chart;
mod confirm;
mod footer;
mod header;
mod layout;
mod progress;
mod summary;
mod theme;

pub use confirm::{ConfirmView, list_capacity};
pub use footer::Footer;
pub use header::{Header, operation_label};
pub use layout::AppLayout;
pub use progress::ProgressView;
pub use summary::SummaryView;
pub use theme::Theme;

/// Keep the tail of `text` so it fits in `max` columns, marking the cut with `...`
pub fn truncate_left(text: &str, max: usize) -> String {
    let len = text.chars().count();
    if len <= max {
        return text.to_string();
    }
    if max <= 3 {
        return ".".repeat(max);
    }
    let tail: String = text.chars().skip(len - (max - 3)).collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_left() {
        assert_eq!(truncate_left("/tmp/a", 10), "/tmp/a");
        assert_eq!(truncate_left("/very/long/path/file.txt", 12), ".../file.txt");
        assert_eq!(truncate_left("/tmp/a", 2), "..");
    }

    #[test]
    fn test_truncate_left_multibyte() {
        assert_eq!(truncate_left("/tmp/ünïcödé", 8), "...ïcödé");
    }
}
