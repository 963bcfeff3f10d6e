use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use nmr_core::run::RunState;
use nmr_render::scope::ScopeView;
use nmr_render::ui;
use nmr_serial::ReaderHandle;
use ratatui::DefaultTerminal;

use crate::driver::RefreshDriver;

/// Terminal UI state: the refresh driver plus everything drawn on screen.
pub struct App {
    driver: RefreshDriver,
    view: ScopeView,
    status_rx: Option<flume::Receiver<String>>,
    refresh: Duration,
    quit: bool,
    last_state: RunState,
}

impl App {
    #[must_use]
    pub fn new(
        driver: RefreshDriver,
        view: ScopeView,
        status_rx: Option<flume::Receiver<String>>,
        refresh: Duration,
    ) -> Self {
        Self {
            driver,
            view,
            status_rx,
            refresh,
            quit: false,
            last_state: RunState::Idle,
        }
    }

    /// Main loop. Returns when the user closes the display; the caller then
    /// stops the reader.
    ///
    /// The display stays open after the run ends so the final traces can be inspected.
    ///
    /// # Errors
    /// Returns an error if terminal operations fail.
    pub fn run(&mut self, mut terminal: DefaultTerminal, reader: &ReaderHandle) -> Result<()> {
        let mut last_tick = Instant::now();
        self.refresh_once(reader);
        terminal.draw(|frame| ui::draw(frame, &self.view))?;

        while !self.quit {
            let elapsed = last_tick.elapsed();
            if elapsed < self.refresh {
                // Sleep out the period, but stay responsive to keys.
                let remaining = self.refresh.saturating_sub(elapsed);
                if event::poll(remaining)? {
                    self.handle_event(&event::read()?);
                }
                continue;
            }
            last_tick = Instant::now();

            while event::poll(Duration::ZERO)? {
                self.handle_event(&event::read()?);
            }

            self.refresh_once(reader);
            terminal.draw(|frame| ui::draw(frame, &self.view))?;
        }
        Ok(())
    }

    /// Pull status lines and run state, then one driver tick.
    fn refresh_once(&mut self, reader: &ReaderHandle) {
        if let Some(rx) = &self.status_rx {
            for line in rx.try_iter() {
                self.view.push_status(line);
            }
        }
        let state = reader.state();
        if state != self.last_state {
            self.view.set_state(state.clone());
            self.last_state = state;
        }
        self.driver.tick(&mut self.view);
    }

    fn handle_event(&mut self, event: &Event) {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = *event
        {
            match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
                KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
                KeyCode::Char('l') => self.view.toggle_log_magnitude(),
                _ => {}
            }
        }
    }
}
