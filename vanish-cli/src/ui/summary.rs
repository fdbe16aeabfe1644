use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, Padding, Widget},
};
use vanish_core::engine::workflow::RequestKind;
use vanish_core::Phase;

use crate::app::AppState;
use crate::report::headline;

use super::layout::centered;
use super::theme::Theme;
use super::truncate_left;

const SHOWN_FAILURES: usize = 5;

/// Result dialog shown once the workflow reached a terminal phase
pub struct SummaryView<'a> {
    state: &'a AppState,
    theme: &'a Theme,
}

impl<'a> SummaryView<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }
}

impl Widget for SummaryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let workflow = self.state.workflow();
        let report = workflow.report();
        let phase = workflow.phase();

        let failures = report.failures.len();
        let shown = failures.min(SHOWN_FAILURES);
        // headline, details, failures, more, blank, hint + borders and padding
        let lines = 1 + 2 + shown + usize::from(failures > shown) + 1 + 1;
        let dialog_area = centered(64, lines as u16 + 4, area);
        Clear.render(dialog_area, buf);

        let title = match phase {
            Phase::Done => " Done ",
            Phase::Error => " Error ",
            _ => " Cancelled ",
        };
        let accent = self.theme.outcome_color(phase);
        let block = Block::default()
            .title(title)
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(self.theme.bg_surface))
            .padding(Padding::uniform(1));

        let inner = block.inner(dialog_area);
        block.render(dialog_area, buf);
        if inner.height < 2 || inner.width < 10 {
            return;
        }

        let max_w = inner.width as usize;
        let text_style = Style::default().fg(self.theme.fg);
        let dim_style = Style::default().fg(self.theme.fg_dim);
        let mut row = inner.y;

        buf.set_string(
            inner.x,
            row,
            truncate_left(&headline(workflow), max_w),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        );
        row += 1;

        let mut details = Vec::new();
        if phase == Phase::Done && workflow.kind() == RequestKind::Delete && report.succeeded() > 0 {
            details.push(format!(
                "Recoverable for {} days with vx --restore",
                self.state.retention_days
            ));
        }
        if workflow.kind() == RequestKind::Delete && report.purged > 0 {
            details.push(format!("Removed {} expired item(s)", report.purged));
        }
        if !report.skipped.is_empty() {
            details.push(format!("{} item(s) skipped", report.skipped.len()));
        }
        for line in details {
            buf.set_string(inner.x, row, truncate_left(&line, max_w), text_style);
            row += 1;
        }

        let fail_style = Style::default().fg(self.theme.red);
        for failure in report.failures.iter().take(shown) {
            buf.set_string(inner.x, row, truncate_left(&failure.message, max_w), fail_style);
            row += 1;
        }
        if failures > shown {
            let more = format!("...and {} more", failures - shown);
            buf.set_string(inner.x, row, &more, dim_style);
            row += 1;
        }

        let hint_y = (row + 1).max(inner.y + inner.height.saturating_sub(1));
        if hint_y < inner.y + inner.height {
            buf.set_string(
                inner.x,
                hint_y,
                "[Enter]",
                Style::default()
                    .fg(self.theme.green)
                    .add_modifier(Modifier::BOLD),
            );
            buf.set_string(inner.x + 8, hint_y, "Close", text_style);
        }
    }
}
