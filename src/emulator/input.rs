/// Represents something that accepts keypad input in the range 0..0xF.
///
/// Call `key_pressed` before `update_key_state` so that anything woken by
/// the new key state already sees the key.
pub trait KeyPort {
    /// Bit `i` of `state` is set when key `i` is held.
    fn update_key_state(&mut self, state: u16);
    /// The most recently pressed key.
    fn key_pressed(&mut self, key: u8);
}

/// Which of the 16 keys are held, plus the last one pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keypad {
    state: u16,
    last: Option<u8>,
}

impl Keypad {
    pub fn new() -> Keypad {
        Keypad::default()
    }

    pub fn state(&self) -> u16 {
        self.state
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        key <= 0xF && self.state & (1 << key) != 0
    }

    /// Returns whether the state or the last key changed.
    pub fn press(&mut self, key: u8) -> bool {
        if key > 0xF {
            return false;
        }
        let changed = self.last != Some(key) || !self.is_pressed(key);
        self.last = Some(key);
        self.state |= 1 << key;
        changed
    }

    pub fn release(&mut self, key: u8) -> bool {
        if !self.is_pressed(key) {
            return false;
        }
        self.state &= !(1 << key);
        true
    }

    /// Send the current state to a port, last key first.
    pub fn send_to<P: KeyPort + ?Sized>(&self, port: &mut P) {
        if let Some(key) = self.last {
            port.key_pressed(key);
        }
        port.update_key_state(self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl KeyPort for Recorder {
        fn update_key_state(&mut self, state: u16) {
            self.0.push(format!("state {:#06x}", state));
        }
        fn key_pressed(&mut self, key: u8) {
            self.0.push(format!("key {:x}", key));
        }
    }

    #[test]
    fn press_and_release() {
        let mut keypad = Keypad::new();
        assert!(keypad.press(0xA));
        assert!(!keypad.press(0xA));
        assert!(keypad.press(3));
        assert_eq!(0b0000_0100_0000_1000, keypad.state());
        assert_eq!(Some(3), keypad.last());
        assert!(keypad.release(0xA));
        assert!(!keypad.release(0xA));
        assert!(!keypad.press(0x10));
        assert_eq!(0b1000, keypad.state());
    }

    #[test]
    fn last_key_is_sent_before_state() {
        let mut keypad = Keypad::new();
        keypad.press(7);
        let mut recorder = Recorder::default();
        keypad.send_to(&mut recorder);
        assert_eq!(vec!["key 7".to_string(), "state 0x0080".to_string()], recorder.0);
    }
}
