use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};
use vanish_core::{Phase, format_size};

use crate::app::AppState;

use super::theme::Theme;

/// Keyboard hints for a phase
pub fn hints(phase: Phase) -> &'static [(&'static str, &'static str)] {
    match phase {
        Phase::Confirming => &[("y", "Yes"), ("n", "Cancel"), ("↑↓", "Scroll")],
        Phase::Checking => &[("q", "Quit")],
        Phase::Moving | Phase::Restoring => &[("q", "Stop after current item")],
        Phase::Cleanup | Phase::Clearing | Phase::Purging => &[],
        Phase::Done | Phase::Error | Phase::Cancelled => &[("Enter", "Close")],
    }
}

/// Footer widget showing keyboard hints and batch totals
pub struct Footer<'a> {
    state: &'a AppState,
    theme: &'a Theme,
}

impl<'a> Footer<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }
}

impl Widget for Footer<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 20 || area.height < 1 {
            return;
        }

        let hints = hints(self.state.phase());
        let key_style = Style::default()
            .fg(self.theme.fg)
            .add_modifier(Modifier::BOLD);
        let desc_style = Style::default().fg(self.theme.fg_dim);
        let sep_style = Style::default().fg(self.theme.border);

        let mut x = area.x + 1;
        for (i, (key, desc)) in hints.iter().enumerate() {
            buf.set_string(x, area.y, *key, key_style);
            x += key.chars().count() as u16 + 1;

            buf.set_string(x, area.y, *desc, desc_style);
            x += desc.chars().count() as u16;

            if i < hints.len() - 1 {
                buf.set_string(x, area.y, "  │  ", sep_style);
                x += 5;
            }

            if x >= area.x + area.width - 5 {
                break;
            }
        }

        let report = self.state.workflow().report();
        if report.succeeded() > 0 {
            let done_text = format!(
                "{} ({} item{})",
                format_size(report.bytes_processed),
                report.succeeded(),
                if report.succeeded() == 1 { "" } else { "s" }
            );
            let stats_style = Style::default()
                .fg(self.theme.green)
                .add_modifier(Modifier::BOLD);
            let stats_x = area.x + area.width.saturating_sub(done_text.chars().count() as u16 + 1);
            if stats_x > x + 2 {
                buf.set_string(stats_x, area.y, &done_text, stats_style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirming_offers_yes_and_no() {
        let keys: Vec<&str> = hints(Phase::Confirming).iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["y", "n", "↑↓"]);
    }

    #[test]
    fn test_terminal_phases_offer_close() {
        for phase in [Phase::Done, Phase::Error, Phase::Cancelled] {
            assert_eq!(hints(phase), &[("Enter", "Close")]);
        }
    }
}
