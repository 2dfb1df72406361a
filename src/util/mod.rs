//! Small helpers that don't belong to any single emulator unit.

pub mod bit_splitter;
