// event.rs
use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEvent};
use tracing::{error, warn};

use crate::loader::LoadOutcome;

pub enum Event {
    Tick,
    Input(KeyEvent),
    Mouse(MouseEvent),
    Resize,
    /// A background load resolved, successfully or not.
    Loaded(Box<LoadOutcome>),
}

/// Terminal input and load results arrive on one channel, so the event loop
/// is the only place application state changes.
pub struct EventHandler {
    sender: Sender<Event>,
    receiver: Receiver<Event>,
    #[allow(dead_code)]
    input_thread: thread::JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> EventHandler {
        let (sender, receiver) = mpsc::channel();
        let input_sender = sender.clone();
        let input_thread = thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or_else(|| Duration::from_secs(0));

                // Poll for a crossterm event.
                let ready = match event::poll(timeout) {
                    Ok(ready) => ready,
                    Err(e) => {
                        error!("unable to poll for terminal events: {e}");
                        break;
                    }
                };
                if ready {
                    let forwarded = match event::read() {
                        Ok(CrosstermEvent::Key(e)) => Some(Event::Input(e)),
                        Ok(CrosstermEvent::Mouse(e)) => Some(Event::Mouse(e)),
                        Ok(CrosstermEvent::Resize(_, _)) => Some(Event::Resize),
                        Ok(_) => None,
                        Err(e) => {
                            warn!("unable to read terminal event: {e}");
                            None
                        }
                    };
                    if let Some(event) = forwarded {
                        if input_sender.send(event).is_err() {
                            break;
                        }
                    }
                }

                // If enough time has passed, send a `Tick` event.
                if last_tick.elapsed() >= tick_rate {
                    if input_sender.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });
        EventHandler {
            sender,
            receiver,
            input_thread,
        }
    }

    /// Handle for background workers that report back through the loop.
    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    pub fn next(&self, timeout: Duration) -> Result<Option<Event>, RecvTimeoutError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
