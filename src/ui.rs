use crate::audio::MediaEngine;
use crate::controller::{Notice, PlaybackController};
use crate::cover::CoverCache;
use crate::model::{PlayState, format_time};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap};

const APP_TITLE: &str = "trackdeck  ";

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    selected_bg: Color,
}

const PALETTE: Palette = Palette {
    bg: Color::Rgb(16, 12, 22),
    panel_bg: Color::Rgb(26, 21, 36),
    panel_alt_bg: Color::Rgb(33, 27, 48),
    border: Color::Rgb(57, 197, 187),
    text: Color::Rgb(232, 226, 240),
    muted: Color::Rgb(150, 140, 170),
    accent: Color::Rgb(19, 209, 195),
    alert: Color::Rgb(232, 121, 171),
    selected_bg: Color::Rgb(48, 40, 70),
};

/// UI-only state that lives next to the controller on the control thread.
#[derive(Debug, Default)]
pub struct ViewState {
    pub cursor: usize,
    pub playlist: ListState,
    pub covers: CoverCache,
    /// Most recent notice; stays on screen until a newer one arrives.
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiLayout {
    pub header: Rect,
    pub now_playing: Rect,
    pub playlist: Rect,
    pub timeline: Rect,
    pub footer: Rect,
}

pub fn layout(area: Rect) -> UiLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(vertical[1]);

    UiLayout {
        header: vertical[0],
        now_playing: body[0],
        playlist: body[1],
        timeline: vertical[2],
        footer: vertical[3],
    }
}

/// Maps a click inside the timeline panel to a track fraction.
pub fn timeline_fraction(timeline: Rect, column: u16, row: u16) -> Option<f64> {
    let inner = inner_rect(timeline);
    if inner.width == 0 || !point_in_rect(column, row, inner) {
        return None;
    }
    let offset = f64::from(column - inner.x);
    let span = f64::from(inner.width.saturating_sub(1).max(1));
    Some((offset / span).clamp(0.0, 1.0))
}

/// Maps a click inside the playlist panel to a catalog index.
pub fn playlist_row(playlist: Rect, scroll_offset: usize, column: u16, row: u16) -> Option<usize> {
    let inner = inner_rect(playlist);
    if !point_in_rect(column, row, inner) {
        return None;
    }
    Some(scroll_offset + usize::from(row - inner.y))
}

pub fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn inner_rect(rect: Rect) -> Rect {
    rect.inner(Margin {
        vertical: 1,
        horizontal: 1,
    })
}

pub fn draw<E: MediaEngine>(
    frame: &mut Frame,
    controller: &PlaybackController<E>,
    view: &mut ViewState,
) {
    let colors = PALETTE;
    let areas = layout(frame.area());
    let snapshot = controller.snapshot();
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let state_label = match snapshot.play_state {
        PlayState::Playing => "Playing",
        PlayState::Paused => "Paused",
        PlayState::Stopped => "Stopped",
    };
    let engine_name = controller
        .engine()
        .output_name()
        .unwrap_or_else(|| String::from("-"));
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(state_label, Style::default().fg(colors.text)),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!("Shuffle {}", flag(snapshot.shuffle_enabled)),
            Style::default().fg(toggle_color(snapshot.shuffle_enabled, &colors)),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!("Loop {}", flag(snapshot.loop_enabled)),
            Style::default().fg(toggle_color(snapshot.loop_enabled, &colors)),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(engine_name, Style::default().fg(colors.muted)),
    ]))
    .block(panel_block("Status", colors.panel_bg, colors.text, colors.border));
    frame.render_widget(header, areas.header);

    draw_now_playing(frame, controller, view, areas.now_playing, &colors);
    draw_playlist(frame, controller, view, areas.playlist, &colors);

    let ratio = snapshot.progress_ratio().unwrap_or(0.0);
    let duration_label = if snapshot.duration_seconds > 0.0 {
        format_time(snapshot.duration_seconds)
    } else {
        String::from("-:--")
    };
    let timeline = Gauge::default()
        .block(panel_block(
            "Timeline",
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .gauge_style(Style::default().fg(colors.accent).bg(colors.panel_alt_bg))
        .ratio(ratio)
        .label(format!(
            "{} / {}",
            format_time(snapshot.position_seconds),
            duration_label
        ));
    frame.render_widget(timeline, areas.timeline);

    let mut footer_spans = Vec::new();
    if let Some(notice) = &view.notice {
        footer_spans.push(Span::styled(
            format!("! {notice}"),
            Style::default()
                .fg(colors.alert)
                .add_modifier(Modifier::BOLD),
        ));
        footer_spans.push(Span::styled("  |  ", Style::default().fg(colors.muted)));
    }
    footer_spans.extend([
        Span::styled(controller.status.as_str(), Style::default().fg(colors.text)),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            "Space play/pause, n/p next/prev, <-/-> seek, 0-9 jump, s shuffle, l loop, x stop, Enter select, q quit",
            Style::default().fg(colors.muted),
        ),
    ]);
    let footer = Paragraph::new(Line::from(footer_spans))
    .block(panel_block(
        "Message",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(footer, areas.footer);
}

fn draw_now_playing<E: MediaEngine>(
    frame: &mut Frame,
    controller: &PlaybackController<E>,
    view: &mut ViewState,
    area: Rect,
    colors: &Palette,
) {
    let track = controller.current_track();
    let block = panel_block("Now Playing", colors.panel_alt_bg, colors.text, colors.border);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(inner);

    let info = Paragraph::new(vec![
        Line::from(Span::styled(
            track.title.as_str(),
            Style::default()
                .fg(colors.text)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("by {}", track.creator),
            Style::default().fg(colors.muted),
        )),
        Line::from(Span::styled(
            track.genre.as_str(),
            Style::default()
                .fg(colors.alert)
                .add_modifier(Modifier::ITALIC),
        )),
    ])
    .wrap(Wrap { trim: true });
    frame.render_widget(info, sections[0]);

    let art_area = sections[1];
    let cols = art_area.width.min(art_area.height.saturating_mul(2));
    match view
        .covers
        .get(controller.cover_path(), cols, art_area.height)
    {
        Some(art) => frame.render_widget(Paragraph::new(art.lines()), art_area),
        None => frame.render_widget(
            Paragraph::new(Span::styled("[no cover]", Style::default().fg(colors.muted))),
            art_area,
        ),
    }
}

fn draw_playlist<E: MediaEngine>(
    frame: &mut Frame,
    controller: &PlaybackController<E>,
    view: &mut ViewState,
    area: Rect,
    colors: &Palette,
) {
    let current = controller.current_index();
    let items: Vec<ListItem> = controller
        .catalog()
        .tracks()
        .iter()
        .enumerate()
        .map(|(idx, track)| {
            let marker = if idx == current { "  > " } else { "    " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(colors.accent)),
                Span::styled(track.title.as_str(), Style::default().fg(colors.text)),
                Span::styled(
                    format!("  by {}", track.creator),
                    Style::default().fg(colors.muted),
                ),
            ]))
        })
        .collect();

    view.playlist.select(Some(view.cursor));
    let list = List::new(items)
        .block(panel_block(
            "Playlist",
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("› ");
    frame.render_stateful_widget(list, area, &mut view.playlist);
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn flag(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn toggle_color(enabled: bool, colors: &Palette) -> Color {
    if enabled { colors.accent } else { colors.muted }
}
