use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex},
    time::{Duration, Instant},
};

/// A thread-safe buffer of keypad presses with timestamps.
/// For use with a producer and a consumer of keys.
/// Wrap it in an `std::sync::Arc` and you are good to go.
pub struct KeyBuffer {
    timeout: Duration,
    buffer: Mutex<VecDeque<(u8, Instant)>>,
    condvar: Condvar,
}

impl KeyBuffer {
    /// Create a new `KeyBuffer` that drops presses older than `timeout`.
    pub fn new(timeout: Duration) -> KeyBuffer {
        KeyBuffer {
            timeout,
            buffer: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
        }
    }

    /// Push a new keypress to the buffer.
    pub fn push(&self, key: u8) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push_back((key, Instant::now()));
            self.condvar.notify_one();
        }
    }

    /// Pop the oldest keypress that is still fresh, waiting up to `wait` for one.
    pub fn pop_timeout(&self, wait: Duration) -> Option<u8> {
        let deadline = Instant::now() + wait;
        let mut buffer = self.buffer.lock().ok()?;
        loop {
            while let Some((key, timestamp)) = buffer.pop_front() {
                if timestamp.elapsed() < self.timeout {
                    return Some(key);
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            buffer = self.condvar.wait_timeout(buffer, deadline - now).ok()?.0;
        }
    }
}
