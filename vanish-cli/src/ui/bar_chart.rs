/// Unicode partial block characters for smooth progress bars
const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Bar of exactly `width` cells filled to `percentage`, using partial blocks
pub fn render_bar(percentage: f64, width: usize) -> String {
    let percentage = percentage.clamp(0.0, 100.0);
    let filled = percentage / 100.0 * width as f64;
    let full = (filled.floor() as usize).min(width);
    let partial = ((filled - full as f64) * 8.0).round() as usize;

    let mut bar: String = std::iter::repeat_n(BLOCKS[8], full).collect();
    if full < width && partial > 0 {
        bar.push(BLOCKS[partial.min(8)]);
    }
    let pad = width - bar.chars().count();
    bar.extend(std::iter::repeat_n(' ', pad));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bar_empty() {
        let bar = render_bar(0.0, 10);
        assert_eq!(bar.chars().count(), 10);
        assert!(bar.chars().all(|c| c == ' '));
    }

    #[test]
    fn test_render_bar_full_and_overflow() {
        assert!(render_bar(100.0, 10).chars().all(|c| c == '█'));
        assert_eq!(render_bar(250.0, 4), "████");
    }

    #[test]
    fn test_render_bar_partial_block() {
        // 2.5 cells filled: two full blocks and a half block
        let bar = render_bar(25.0, 10);
        assert_eq!(bar.chars().count(), 10);
        assert!(bar.starts_with("██▌"));
    }

    #[test]
    fn test_render_bar_zero_width() {
        assert_eq!(render_bar(50.0, 0), "");
    }
}
