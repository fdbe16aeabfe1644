use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};
use vanish_core::engine::workflow::RequestKind;

use crate::app::AppState;

use super::progress::{phase_label, spinner};
use super::theme::Theme;

/// Header widget showing title, operation, and status
pub struct Header<'a> {
    state: &'a AppState,
    operation: &'a str,
    theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(state: &'a AppState, operation: &'a str, theme: &'a Theme) -> Self {
        Self {
            state,
            operation,
            theme,
        }
    }
}

/// Short description of the request shown next to the title
pub fn operation_label(kind: RequestKind, count: usize, purge_days: Option<u32>) -> String {
    let plural = if count == 1 { "" } else { "s" };
    match kind {
        RequestKind::Delete => format!("Delete {count} item{plural}"),
        RequestKind::Restore => format!("Restore {count} pattern{plural}"),
        RequestKind::Clear => "Clear cache".to_string(),
        RequestKind::Purge => format!("Purge items older than {} days", purge_days.unwrap_or(0)),
    }
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 10 || area.height < 1 {
            return;
        }

        let title_style = Style::default()
            .fg(self.theme.purple)
            .add_modifier(Modifier::BOLD);
        buf.set_string(area.x + 1, area.y, "VX", title_style);
        buf.set_string(area.x + 4, area.y, "─", Style::default().fg(self.theme.border));

        let workflow = self.state.workflow();
        let phase = workflow.phase();
        let status = if phase.is_terminal() {
            phase_label(phase, workflow.kind()).to_string()
        } else {
            format!(
                "{} {}",
                spinner(self.state.spinner_frame),
                phase_label(phase, workflow.kind())
            )
        };
        let status_len = status.chars().count() as u16;

        let max_op = area.width.saturating_sub(status_len + 10) as usize;
        let operation = super::truncate_left(self.operation, max_op);
        buf.set_string(area.x + 6, area.y, &operation, Style::default().fg(self.theme.fg));

        let status_style = if phase.is_terminal() {
            Style::default().fg(self.theme.outcome_color(phase))
        } else {
            Style::default().fg(self.theme.yellow)
        };
        let status_x = area.x + area.width.saturating_sub(status_len + 2);
        buf.set_string(status_x, area.y, &status, status_style);
    }
}
