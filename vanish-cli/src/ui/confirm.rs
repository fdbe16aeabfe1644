use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, Padding, Widget},
};
use vanish_core::engine::workflow::RequestKind;
use vanish_core::{FileTarget, format_count, format_size};

use crate::app::AppState;

use super::layout::centered;
use super::theme::Theme;
use super::truncate_left;

const DIALOG_WIDTH: u16 = 72;
/// Borders, padding, header line, blank, total line and hints
const CHROME: u16 = 2 + 2 + 1 + 1 + 1 + 1;

fn dialog_area(area: Rect, rows: usize) -> Rect {
    let wanted = (rows as u16).saturating_add(CHROME);
    centered(DIALOG_WIDTH, wanted, area)
}

/// Number of list rows the dialog can show inside `area`
pub fn list_capacity(area: Rect, rows: usize) -> usize {
    dialog_area(area, rows).height.saturating_sub(CHROME).max(1) as usize
}

fn flags(target: &FileTarget) -> String {
    let mut flags = Vec::new();
    if target.verdict.protected {
        flags.push("protected");
    }
    if target.verdict.large {
        flags.push("large");
    }
    if flags.is_empty() && target.needs_confirm() {
        flags.push("sensitive");
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    }
}

/// Confirmation dialog listing what is about to be moved or restored
pub struct ConfirmView<'a> {
    state: &'a AppState,
    theme: &'a Theme,
}

impl<'a> ConfirmView<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }
}

impl Widget for ConfirmView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let workflow = self.state.workflow();
        let restoring = workflow.kind() == RequestKind::Restore;
        let count = if restoring {
            workflow.candidates().len()
        } else {
            workflow.targets().len()
        };

        let dialog_area = dialog_area(area, count);
        Clear.render(dialog_area, buf);

        let (title, border) = if restoring {
            (" Restore? ", self.theme.blue)
        } else {
            (" Move to cache? ", self.theme.red)
        };
        let block = Block::default()
            .title(title)
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(self.theme.bg_surface))
            .padding(Padding::uniform(1));

        let inner = block.inner(dialog_area);
        block.render(dialog_area, buf);
        if inner.height < 4 || inner.width < 20 {
            return;
        }

        let text_style = Style::default().fg(self.theme.fg);
        let path_style = Style::default()
            .fg(self.theme.yellow)
            .add_modifier(Modifier::BOLD);
        let dim_style = Style::default().fg(self.theme.fg_dim);
        let flag_style = Style::default().fg(self.theme.red);
        let key_style = Style::default()
            .fg(self.theme.green)
            .add_modifier(Modifier::BOLD);

        let max_w = inner.width as usize;
        let capacity = inner.height.saturating_sub(CHROME - 4).max(1) as usize;
        let offset = self.state.scroll_offset.min(count.saturating_sub(capacity));
        let mut row = inner.y;

        let header = format!(
            "{} {} item{}:",
            if restoring { "Restore" } else { "Move" },
            count,
            if count == 1 { "" } else { "s" }
        );
        buf.set_string(inner.x, row, &header, text_style);
        row += 1;

        let rows: Vec<(bool, String, String, String)> = if restoring {
            workflow
                .candidates()
                .iter()
                .map(|entry| {
                    let deleted = entry
                        .delete_time
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M");
                    (
                        entry.is_directory,
                        entry.original_path.to_string_lossy().into_owned(),
                        format!("  (deleted: {deleted})"),
                        String::new(),
                    )
                })
                .collect()
        } else {
            workflow
                .targets()
                .iter()
                .map(|target| {
                    let mut detail = format!("  ({}", format_size(target.size()));
                    if target.is_directory {
                        detail.push_str(&format!(", {} items", format_count(target.file_count())));
                    }
                    detail.push(')');
                    (
                        target.is_directory,
                        target.path.to_string_lossy().into_owned(),
                        detail,
                        flags(target),
                    )
                })
                .collect()
        };

        for (is_directory, path, detail, flag) in rows.iter().skip(offset).take(capacity) {
            let icon = if *is_directory { "▸ " } else { "  " };
            buf.set_string(
                inner.x,
                row,
                icon,
                Style::default().fg(self.theme.icon_color(*is_directory)),
            );
            let avail = max_w.saturating_sub(detail.chars().count() + flag.chars().count() + 2);
            let display_path = truncate_left(path, avail);
            let mut x = inner.x + 2;
            buf.set_string(x, row, &display_path, path_style);
            x += display_path.chars().count() as u16;
            buf.set_string(x, row, detail, dim_style);
            x += detail.chars().count() as u16;
            buf.set_string(x, row, flag, flag_style);
            row += 1;
        }

        row += 1;
        let mut total = if restoring {
            format!("Total items to restore: {count}")
        } else {
            let bytes: u64 = workflow.targets().iter().map(FileTarget::size).sum();
            format!(
                "Total: {} | Recoverable for {} days",
                format_size(bytes),
                self.state.retention_days
            )
        };
        if count > capacity {
            total.push_str(&format!("  ({}-{} of {count})", offset + 1, (offset + capacity).min(count)));
        }
        buf.set_string(inner.x, row, &total, text_style);

        let hints_y = (row + 1).max(inner.y + inner.height.saturating_sub(1));
        let yes = if restoring { "Yes, restore" } else { "Yes, move" };
        buf.set_string(inner.x, hints_y, "[y]", key_style);
        buf.set_string(inner.x + 4, hints_y, yes, text_style);
        let no_x = inner.x + 4 + yes.len() as u16 + 3;
        buf.set_string(no_x, hints_y, "[n]", key_style);
        buf.set_string(no_x + 4, hints_y, "Cancel", text_style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vanish_core::safety::Verdict;
    use vanish_core::walk::Totals;

    fn target(verdict: Verdict) -> FileTarget {
        FileTarget {
            path: PathBuf::from("/etc/hosts"),
            exists: true,
            is_directory: false,
            totals: Totals::default(),
            verdict,
        }
    }

    #[test]
    fn test_flags() {
        assert_eq!(flags(&target(Verdict::default())), "");
        let protected = Verdict {
            protected: true,
            needs_confirm: true,
            ..Verdict::default()
        };
        assert_eq!(flags(&target(protected)), " [protected]");
        let pattern = Verdict {
            needs_confirm: true,
            ..Verdict::default()
        };
        assert_eq!(flags(&target(pattern)), " [sensitive]");
    }

    #[test]
    fn test_list_capacity_shrinks_with_area() {
        assert_eq!(list_capacity(Rect::new(0, 0, 80, 40), 3), 3);
        // 12 rows of body: 10 for the dialog, 2 for the list
        assert_eq!(list_capacity(Rect::new(0, 0, 80, 12), 50), 2);
    }
}
