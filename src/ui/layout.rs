use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub const SIDEBAR_WIDTH: u16 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatchLayout {
    pub header: Rect,
    pub transcript: Rect,
    pub sidebar: Option<Rect>,
    pub status: Rect,
}

/// Header row, transcript (with an optional right sidebar) and a status row.
/// The sidebar is dropped when the terminal is too narrow to keep a usable
/// transcript next to it.
pub fn split_watch_layout(area: Rect, sidebar_open: bool) -> WatchLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let show_sidebar = sidebar_open && rows[1].width >= SIDEBAR_WIDTH * 2;
    let (transcript, sidebar) = if show_sidebar {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(SIDEBAR_WIDTH)])
            .split(rows[1]);
        (columns[0], Some(columns[1]))
    } else {
        (rows[1], None)
    };

    WatchLayout {
        header: rows[0],
        transcript,
        sidebar,
        status: rows[2],
    }
}

/// Centered rectangle clamped to the frame, used by modal overlays.
pub fn centered_rect(area: Rect, min_width: u16, max_width: u16, min_height: u16, max_height: u16) -> Rect {
    let width = area.width.clamp(min_width, max_width).min(area.width);
    let height = area.height.clamp(min_height, max_height).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
