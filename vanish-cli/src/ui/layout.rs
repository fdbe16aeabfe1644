use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Main application layout
pub struct AppLayout {
    pub header: Rect,
    pub progress_bar: Rect,
    pub body: Rect,
    pub footer: Rect,
}

impl AppLayout {
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Length(1), // Progress bar
                Constraint::Min(5),    // Dialogs and progress
                Constraint::Length(1), // Footer
            ])
            .split(area);

        Self {
            header: chunks[0],
            progress_bar: chunks[1],
            body: chunks[2],
            footer: chunks[3],
        }
    }
}

/// Centered rectangle of at most `width` x `height`, keeping a 2 cell margin
pub fn centered(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}
