use std::io::Stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::map::MapAdapter;
use crate::ui;

pub mod actions;
pub mod controller;
pub mod state;

pub use actions::Action;
pub use controller::{ControllerSettings, LocController};
pub use state::{AppState, ListedLocation, LocationDialog, OverlayState, TextInput};

pub struct App<M: MapAdapter> {
    controller: LocController<M>,
    list_state: ListState,
    tick_rate: Duration,
}

impl<M: MapAdapter> App<M> {
    pub fn new(controller: LocController<M>) -> Self {
        Self {
            controller,
            list_state: ListState::default(),
            tick_rate: Duration::from_millis(250),
        }
    }

    pub fn controller(&self) -> &LocController<M> {
        &self.controller
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            let size = terminal.size().context("reading terminal size")?;
            self.controller
                .map_mut()
                .set_viewport(ui::map_viewport(size));
            terminal
                .draw(|frame| {
                    let state = self.controller.state();
                    if state.is_empty() {
                        self.list_state.select(None);
                    } else {
                        self.list_state.select(Some(state.cursor));
                    }
                    ui::draw_app(frame, state, self.controller.map(), &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.controller.state().should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.controller.on_tick(Instant::now());
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.handle_overlay_key(key) {
            return;
        }
        if let Some(action) = actions::main_view_action(key, self.controller.state()) {
            self.controller.dispatch(action);
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        if self.controller.state().overlay().is_none() {
            return false;
        }
        match key.code {
            KeyCode::Esc => {
                self.controller.dispatch(Action::CloseDialog);
                return true;
            }
            KeyCode::Enter => {
                self.controller.dispatch(Action::ConfirmDialog);
                return true;
            }
            _ => {}
        }
        let Some(overlay) = self.controller.state_mut().overlay.as_mut() else {
            return true;
        };
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                if let OverlayState::AddLocation(dialog) | OverlayState::UpdateLocation(dialog) =
                    overlay
                {
                    dialog.toggle_focus();
                }
                return true;
            }
            _ => {}
        }
        let Some(input) = overlay.text_input_mut() else {
            return true;
        };
        match key.code {
            KeyCode::Backspace => {
                input.backspace();
            }
            KeyCode::Delete => {
                input.delete();
            }
            KeyCode::Left => {
                input.move_left();
            }
            KeyCode::Right => {
                input.move_right();
            }
            KeyCode::Home => input.move_home(),
            KeyCode::End => input.move_end(),
            KeyCode::Char(ch)
                if !key.modifiers.intersects(
                    KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                ) =>
            {
                input.insert_char(ch);
            }
            _ => {}
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        if self.controller.state().overlay().is_some() {
            return;
        }
        if let Some(action) = self.controller.map_mut().click(mouse.column, mouse.row) {
            self.controller.dispatch(action);
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
