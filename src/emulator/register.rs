//! Register cells and the small value types some registers hold.
//!
//! Registers live on the board thread only, so a `Cell` is enough to make
//! every write whole: no reader can observe half of a value.

use std::cell::{Cell, RefCell};
use std::fmt;

/// Largest value a 12-bit register can hold.
pub const TRIBBLE_MAX: u16 = 0x0FFF;

type Subscriber<T> = Box<dyn FnMut(T)>;

/// A storage cell that notifies its subscribers on every write.
///
/// Subscribers run synchronously, in subscription order, after the value is
/// stored. A subscriber must not write to the register it is subscribed to.
pub struct Register<T: Copy> {
    name: &'static str,
    value: Cell<T>,
    subscribers: RefCell<Vec<Subscriber<T>>>,
}

impl<T: Copy> Register<T> {
    pub fn new(name: &'static str, value: T) -> Register<T> {
        Register {
            name,
            value: Cell::new(value),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> T {
        self.value.get()
    }

    pub fn set(&self, value: T) {
        self.value.set(value);
        for subscriber in self.subscribers.borrow_mut().iter_mut() {
            subscriber(value);
        }
    }

    pub fn subscribe<F: FnMut(T) + 'static>(&self, subscriber: F) {
        self.subscribers.borrow_mut().push(Box::new(subscriber));
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Register<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.name, self.get())
    }
}

/// A 12-bit register, sized to address the whole 4K space.
/// Writes beyond 12 bits are truncated, not rejected.
pub struct Tribble(Register<u16>);

impl Tribble {
    pub fn new(name: &'static str, value: u16) -> Tribble {
        Tribble(Register::new(name, value & TRIBBLE_MAX))
    }

    pub fn get(&self) -> u16 {
        self.0.get()
    }

    pub fn set(&self, value: u16) {
        if value > TRIBBLE_MAX {
            log::warn!("{} truncated {:#06x} to 12 bits", self.0.name(), value);
        }
        self.0.set(value & TRIBBLE_MAX);
    }

    pub fn subscribe<F: FnMut(u16) + 'static>(&self, subscriber: F) {
        self.0.subscribe(subscriber);
    }
}

impl fmt::Debug for Tribble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:#05x}", self.0.name(), self.get())
    }
}

/// What the value currently in VF means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusType {
    Empty,
    Carry,
    /// Overflow of I when adding a register to it.
    CarryIndex,
    Borrow,
    Lsb,
    Msb,
    Collision,
}

/// The class of the last change to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GraphicChange {
    Idle = 0,
    Erase = 1,
    Noop = 2,
    Draw = 3,
    Mix = 4,
}

impl GraphicChange {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a renderer has anything new to show.
    pub fn is_visible(self) -> bool {
        matches!(self, GraphicChange::Erase | GraphicChange::Draw | GraphicChange::Mix)
    }

    /// Combine two changes that happened between renders.
    pub fn merge(self, next: GraphicChange) -> GraphicChange {
        use GraphicChange::*;
        match (self, next) {
            (Idle, other) | (Noop, other) => other,
            (current, Idle) | (current, Noop) => current,
            (Erase, Erase) => Erase,
            (Draw, Draw) => Draw,
            _ => Mix,
        }
    }
}

/// Run state of the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Operating,
    /// Clock keeps running but no instructions are executed.
    Halt,
    /// Nothing ticks at all.
    StopClock,
    /// Fully suspended; only an explicit wake up resumes.
    Sleep,
}
