use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, Padding, Widget},
};
use vanish_core::engine::workflow::RequestKind;
use vanish_core::{Phase, format_size};

use crate::app::AppState;

use super::bar_chart::render_bar;
use super::theme::Theme;
use super::truncate_left;

/// Braille spinner characters
const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub fn spinner(frame: usize) -> char {
    SPINNER[frame % SPINNER.len()]
}

/// What the app is busy with, for the progress view and the header.
pub fn phase_label(phase: Phase, kind: RequestKind) -> &'static str {
    match phase {
        Phase::Checking if kind == RequestKind::Restore => "Checking items for restoration...",
        Phase::Checking => "Checking files and directories...",
        Phase::Confirming => "Waiting for confirmation",
        Phase::Moving => "Moving to cache...",
        Phase::Restoring => "Restoring...",
        Phase::Cleanup => "Removing expired items...",
        Phase::Clearing => "Clearing cache...",
        Phase::Purging => "Purging old items...",
        Phase::Done => "Done",
        Phase::Error => "Failed",
        Phase::Cancelled => "Cancelled",
    }
}

/// Progress widget shown while the worker is busy
pub struct ProgressView<'a> {
    state: &'a AppState,
    theme: &'a Theme,
}

impl<'a> ProgressView<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }
}

impl Widget for ProgressView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border))
            .padding(Padding::horizontal(1));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height < 3 || inner.width < 20 {
            return;
        }

        let workflow = self.state.workflow();
        let spinner_style = Style::default()
            .fg(self.theme.blue)
            .add_modifier(Modifier::BOLD);
        buf.set_string(
            inner.x,
            inner.y,
            spinner(self.state.spinner_frame).to_string(),
            spinner_style,
        );
        let mut status = phase_label(workflow.phase(), workflow.kind()).to_string();
        if workflow.cancel_requested() {
            status.push_str(" (stopping after current item)");
        }
        buf.set_string(inner.x + 2, inner.y, &status, Style::default().fg(self.theme.fg));

        if let Some(path) = &self.state.current_path {
            let display_path =
                truncate_left(&path.to_string_lossy(), inner.width.saturating_sub(2) as usize);
            buf.set_string(
                inner.x,
                inner.y + 1,
                &display_path,
                Style::default().fg(self.theme.fg_dim),
            );
        }

        if workflow.total() == 0 {
            return;
        }

        let report = workflow.report();
        let stats = format!(
            "{} / {} completed  {} failed  {}",
            workflow.finished(),
            workflow.total(),
            report.failed(),
            format_size(report.bytes_processed),
        );
        buf.set_string(
            inner.x,
            inner.y + 2,
            &stats,
            Style::default().fg(self.theme.fg_muted),
        );

        if inner.height > 4 {
            let pct = workflow.finished() as f64 / workflow.total() as f64 * 100.0;
            let bar = render_bar(pct, inner.width as usize);
            buf.set_string(inner.x, inner.y + 4, &bar, Style::default().fg(self.theme.green));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_label_depends_on_request() {
        assert_eq!(
            phase_label(Phase::Checking, RequestKind::Restore),
            "Checking items for restoration..."
        );
        assert_eq!(
            phase_label(Phase::Checking, RequestKind::Delete),
            "Checking files and directories..."
        );
    }

    #[test]
    fn test_spinner_wraps() {
        assert_eq!(spinner(0), spinner(10));
    }
}
