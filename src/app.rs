use crate::audio::{MediaEngine, NullEngine, RodioEngine};
use crate::catalog::Catalog;
use crate::config::Settings;
use crate::controller::PlaybackController;
use crate::events::{self, ControlEvent, EventSender};
use crate::poller::{PollerError, PositionPoller};
use crate::shuffle::ShuffleSequencer;
use crate::ui::{self, UiLayout, ViewState};
use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{Stdout, stdout};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub settings: Settings,
    pub null_audio: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn run(options: AppOptions) -> Result<()> {
    let settings = options.settings;
    let catalog = load_catalog(&settings)?;
    info!(tracks = catalog.len(), assets = %catalog.asset_dir().display(), "catalog ready");

    let (sender, rx) = events::channel();
    let engine = open_engine(options.null_audio, &sender);
    let sequencer = match settings.shuffle_seed {
        Some(seed) => ShuffleSequencer::seeded(catalog.len(), seed),
        None => ShuffleSequencer::from_os_rng(catalog.len()),
    };
    let mut controller = PlaybackController::new(catalog, engine, sequencer);
    let poller = PositionPoller::spawn(Duration::from_millis(settings.poll_interval_ms), sender)
        .context("failed to start position poller")?;

    let result = with_terminal(|terminal| {
        event_loop(terminal, &mut controller, &rx, settings.seek_step_seconds)
    });
    let shutdown_result = shutdown(poller, &mut controller);
    result?;
    shutdown_result?;
    Ok(())
}

pub fn load_catalog(settings: &Settings) -> Result<Catalog> {
    let asset_dir = settings.asset_dir();
    match &settings.catalog_file {
        Some(path) => Catalog::from_json_file(path, asset_dir)
            .with_context(|| format!("failed to load catalog {}", path.display())),
        None => Ok(Catalog::builtin(asset_dir)),
    }
}

fn open_engine(null_audio: bool, sender: &EventSender) -> Box<dyn MediaEngine> {
    if null_audio {
        return Box::new(NullEngine::new(sender.clone()));
    }
    match RodioEngine::new(sender.clone()) {
        Ok(engine) => Box::new(engine),
        Err(err) => {
            warn!("audio output unavailable, falling back to null engine: {err:#}");
            Box::new(NullEngine::new(sender.clone()))
        }
    }
}

/// Cancels the poller, then releases the engine even if cancelling failed.
pub fn shutdown<E: MediaEngine>(
    poller: PositionPoller,
    controller: &mut PlaybackController<E>,
) -> Result<(), PollerError> {
    let cancelled = poller.cancel();
    if let Err(err) = &cancelled {
        warn!("{err}");
    }
    controller.shutdown();
    cancelled
}

fn with_terminal<T>(
    body: impl FnOnce(&mut Terminal<CrosstermBackend<Stdout>>) -> Result<T>,
) -> Result<T> {
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = body(&mut terminal);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn event_loop<E: MediaEngine>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    controller: &mut PlaybackController<E>,
    rx: &Receiver<ControlEvent>,
    seek_step: f64,
) -> Result<()> {
    let mut view = ViewState::default();
    let mut areas = UiLayout::default();
    let mut last_draw = Instant::now();

    loop {
        controller.tick_engine();
        for control_event in rx.try_iter() {
            controller.handle_event(control_event);
        }
        absorb_notices(controller, &mut view);

        if controller.dirty || last_draw.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| {
                areas = ui::layout(frame.area());
                ui::draw(frame, controller, &mut view);
            })?;
            controller.dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key(controller, &mut view, key, seek_step) == Flow::Quit {
                    break Ok(());
                }
            }
            Event::Mouse(mouse) => handle_mouse(controller, &mut view, mouse, areas),
            Event::Resize(_, _) => controller.dirty = true,
            _ => {}
        }
    }
}

fn handle_key<E: MediaEngine>(
    controller: &mut PlaybackController<E>,
    view: &mut ViewState,
    key: KeyEvent,
    seek_step: f64,
) -> Flow {
    let last = controller.catalog().len() - 1;
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Flow::Quit,
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Char(' ') => controller.toggle_play_pause(),
        KeyCode::Char('n') => controller.next(),
        KeyCode::Char('p') | KeyCode::Char('b') => controller.previous(),
        KeyCode::Char('x') => controller.stop(),
        KeyCode::Char('s') => controller.set_shuffle(!controller.shuffle_enabled()),
        KeyCode::Char('l') => controller.set_loop(!controller.loop_enabled()),
        KeyCode::Char(digit @ '0'..='9') => {
            let tenths = f64::from(digit.to_digit(10).unwrap_or_default());
            controller.seek_to_fraction(tenths / 10.0);
        }
        KeyCode::Left => controller.seek_relative(-seek_step),
        KeyCode::Right => controller.seek_relative(seek_step),
        KeyCode::Up => {
            view.cursor = view.cursor.saturating_sub(1);
            controller.dirty = true;
        }
        KeyCode::Down => {
            view.cursor = (view.cursor + 1).min(last);
            controller.dirty = true;
        }
        KeyCode::Enter => select(controller, view.cursor),
        _ => {}
    }
    Flow::Continue
}

fn handle_mouse<E: MediaEngine>(
    controller: &mut PlaybackController<E>,
    view: &mut ViewState,
    mouse: MouseEvent,
    areas: UiLayout,
) {
    let last = controller.catalog().len() - 1;
    let in_playlist = ui::point_in_rect(mouse.column, mouse.row, areas.playlist);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(fraction) = ui::timeline_fraction(areas.timeline, mouse.column, mouse.row) {
                controller.seek_to_fraction(fraction);
            } else if let Some(index) = ui::playlist_row(
                areas.playlist,
                view.playlist.offset(),
                mouse.column,
                mouse.row,
            )
            .filter(|index| *index <= last)
            {
                view.cursor = index;
                select(controller, index);
            }
        }
        MouseEventKind::ScrollDown if in_playlist => {
            view.cursor = (view.cursor + 1).min(last);
            controller.dirty = true;
        }
        MouseEventKind::ScrollUp if in_playlist => {
            view.cursor = view.cursor.saturating_sub(1);
            controller.dirty = true;
        }
        _ => {}
    }
}

/// Moves the newest pending notice into the view so the footer keeps showing it.
fn absorb_notices<E: MediaEngine>(controller: &mut PlaybackController<E>, view: &mut ViewState) {
    if let Some(latest) = controller.drain_notices().pop() {
        view.notice = Some(latest);
        controller.dirty = true;
    }
}

fn select<E: MediaEngine>(controller: &mut PlaybackController<E>, index: usize) {
    if let Err(err) = controller.select_track(index) {
        controller.status = err.to_string();
        controller.dirty = true;
    }
}
