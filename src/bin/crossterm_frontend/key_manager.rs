use super::key_buffer::KeyBuffer;
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the listener checks whether it should stop.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A struct for managing keypresses that will automatically
/// start a thread that grabs keypresses.
pub struct KeyManager {
    stop: Arc<AtomicBool>,
    quit: Arc<AtomicBool>,
    key_buffer: Arc<KeyBuffer>,
    event_listener: Option<JoinHandle<()>>,
}

impl KeyManager {
    /// Start the event listener thread. Presses older than `timeout` are dropped.
    pub fn new(timeout: Duration) -> KeyManager {
        let stop = Arc::new(AtomicBool::new(false));
        let quit = Arc::new(AtomicBool::new(false));
        let key_buffer = Arc::new(KeyBuffer::new(timeout));
        let event_listener = event_listener(stop.clone(), quit.clone(), key_buffer.clone());
        KeyManager {
            stop,
            quit,
            key_buffer,
            event_listener: Some(event_listener),
        }
    }

    /// Wait up to `wait` for a keypad press.
    pub fn next_key(&self, wait: Duration) -> Option<u8> {
        self.key_buffer.pop_timeout(wait)
    }

    /// Whether the user asked to quit.
    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}

impl Drop for KeyManager {
    fn drop(&mut self) {
        // Tell the event listener to stop, and wait for it
        self.stop.store(true, Ordering::SeqCst);
        if let Some(event_listener) = self.event_listener.take() {
            if event_listener.join().is_err() {
                log::error!("Key listener panicked");
            }
        }
    }
}

/// Starts a thread that listens for key events and pushes keypad keys to the key buffer.
fn event_listener(stop: Arc<AtomicBool>, quit: Arc<AtomicBool>, key_buffer: Arc<KeyBuffer>) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::SeqCst) {
            match poll(POLL_INTERVAL) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(error) => {
                    log::error!("Could not poll for events: {}", error);
                    break;
                }
            }

            let event = match read() {
                Ok(event) => event,
                Err(error) => {
                    log::error!("Could not read event: {}", error);
                    break;
                }
            };
            log::trace!("Got event {:?}", event);

            // Investigate the event
            if let Event::Key(key_event) = event {
                if is_quit(key_event) {
                    quit.store(true, Ordering::SeqCst);
                } else if let Some(key) = keypad_key(key_event.code) {
                    key_buffer.push(key);
                }
            }
        }
    })
}

fn is_quit(key_event: KeyEvent) -> bool {
    match key_event.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key_event.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Map 0-9 and a-f to the hex keypad.
fn keypad_key(key: KeyCode) -> Option<u8> {
    match key {
        KeyCode::Char(c) => c.to_digit(16).map(|digit| digit as u8),
        _ => None,
    }
}
