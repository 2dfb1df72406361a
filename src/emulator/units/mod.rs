//! Execution units. Each one operates on the register file and memory it is handed.

pub mod agu;
pub mod alu;
pub mod lsu;
pub mod stack;

pub use agu::AddressUnit;
pub use alu::Alu;
pub use lsu::LoadStoreUnit;
pub use stack::StackEngine;
