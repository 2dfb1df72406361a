//! The CHIP-8 virtual machine as described at https://en.wikipedia.org/wiki/CHIP-8#Virtual_machine_description.

use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::emulator::config::Config;
use crate::emulator::control_unit::ControlUnit;
use crate::emulator::error::{Error, Result};
use crate::emulator::gpu::FONT;
use crate::emulator::input::KeyPort;
use crate::emulator::memory::{MappedMemory, DISPLAY_SIZE, PROGRAM_SIZE, PROGRAM_START};
use crate::emulator::output::{AudioReceiver, DisplayReceiver, Framebuffer};
use crate::emulator::power;
use crate::emulator::register::{CpuState, GraphicChange, Register};
use crate::emulator::register_file::RegisterFile;

pub struct Cpu {
    registers: Rc<RegisterFile>,
    memory: MappedMemory,
    control: ControlUnit,
    // Every graphic change since the last render, merged.
    pending: Rc<Cell<GraphicChange>>,
}

impl Cpu {
    /// Create a CPU with an entropy-seeded random source.
    pub fn new(config: &Config) -> Result<Cpu> {
        Cpu::with_rng(config, Box::new(StdRng::from_entropy()))
    }

    /// Create a CPU drawing CXKK values from `rng`.
    pub fn with_rng(config: &Config, rng: Box<dyn RngCore>) -> Result<Cpu> {
        config.validate()?;

        let registers = RegisterFile::new();
        let memory = MappedMemory::new(registers.clone(), config.program_split)?;
        let control = ControlUnit::new(&config.quirks, rng);

        let pending = Rc::new(Cell::new(GraphicChange::Idle));
        let latch = pending.clone();
        registers.graphic_change.subscribe(move |change| latch.set(latch.get().merge(change)));
        power::wake_on_input(&registers);

        let mut cpu = Cpu { registers, memory, control, pending };
        cpu.initialize()?;
        Ok(cpu)
    }

    /// Put the font into ROM and reset everything else.
    pub fn initialize(&mut self) -> Result<()> {
        self.memory.flash(self.registers.font_segment.get(), &FONT)?;
        self.reset();
        Ok(())
    }

    /// Back to power-on state. The font and a loaded program survive.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.memory.clear();
        self.pending.set(GraphicChange::Idle);
        log::debug!("CPU reset");
    }

    /// Copy a program into memory at 0x200.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > PROGRAM_SIZE {
            return Err(Error::SegmentBoundaryViolation { address: PROGRAM_START, length: program.len() });
        }
        self.memory.flash(PROGRAM_START, program)?;
        log::debug!("Loaded {} byte program", program.len());
        Ok(())
    }

    /// Write a modified program back to its storage.
    pub fn store(&self) -> Result<Vec<u8>> {
        Err(Error::NotImplemented { operation: "program store" })
    }

    /// Fetch, decode and execute one instruction, unless the CPU is not operating.
    pub fn cycle(&mut self) -> Result<()> {
        if !power::is_operating(&self.registers) {
            return Ok(());
        }
        self.control.step(&self.registers, &mut self.memory)
    }

    /// Execute a single instruction word as if it were found at PC.
    pub fn execute(&mut self, word: u16) -> Result<()> {
        self.registers.memory_address.set(self.registers.program_counter.get());
        self.registers.instruction.set(word);
        self.control.decode(&self.registers)?;
        self.control.execute(&self.registers, &mut self.memory)
    }

    /// Execute many instructions in sequence, stopping at the first error.
    pub fn execute_many(&mut self, words: &[u16]) -> Result<()> {
        for &word in words {
            self.execute(word)?;
        }
        Ok(())
    }

    pub fn delay_tick(&mut self) {
        if power::is_clocked(&self.registers) {
            decrement(&self.registers.delay_timer);
        }
    }

    pub fn sound_tick(&mut self) {
        if power::is_clocked(&self.registers) {
            decrement(&self.registers.sound_timer);
        }
    }

    /// Send the display to `receiver` if it changed visibly since the last render.
    /// Returns whether anything was sent.
    pub fn render(&mut self, receiver: &mut dyn DisplayReceiver) -> bool {
        let change = self.pending.replace(GraphicChange::Idle);
        if !change.is_visible() {
            return false;
        }
        receiver.receive(change, &self.framebuffer());
        true
    }

    /// Report sound on/off edges to `receiver` from now on.
    pub fn attach_audio<A: AudioReceiver + 'static>(&mut self, mut receiver: A) {
        self.registers.sound_on.subscribe(move |on| receiver.receive(on));
    }

    pub fn framebuffer(&self) -> Framebuffer {
        let bytes = self
            .memory
            .get_bytes(self.registers.graphic_segment.get(), DISPLAY_SIZE)
            .unwrap_or_else(|_| vec![0; DISPLAY_SIZE]);
        Framebuffer::new(bytes)
    }

    /// Scroll the display up by `rows` pixel rows.
    pub fn scroll_up(&mut self, rows: usize) -> Result<()> {
        self.control.gpu().scroll_up(&self.registers, &mut self.memory, rows)
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn memory(&self) -> &MappedMemory {
        &self.memory
    }

    pub fn state(&self) -> CpuState {
        self.registers.state.get()
    }

    pub fn halt(&mut self) -> bool {
        power::halt(&self.registers)
    }

    pub fn cont(&mut self) -> bool {
        power::cont(&self.registers)
    }

    pub fn stop_clock(&mut self) -> bool {
        power::stop_clock(&self.registers)
    }

    pub fn start_clock(&mut self) -> bool {
        power::start_clock(&self.registers)
    }

    pub fn sleep(&mut self) -> bool {
        power::sleep(&self.registers)
    }

    pub fn wake_up(&mut self) -> bool {
        power::wake_up(&self.registers)
    }
}

impl KeyPort for Cpu {
    fn update_key_state(&mut self, state: u16) {
        self.registers.input.set(state);
    }

    fn key_pressed(&mut self, key: u8) {
        self.registers.key.set(key & 0xF);
    }
}

fn decrement(timer: &Register<u8>) {
    let value = timer.get();
    if value > 0 {
        timer.set(value - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::config::{DisplayMode, Quirks};
    use pretty_assertions::assert_eq;
    use rand::rngs::mock::StepRng;
    use std::cell::RefCell;

    fn cpu() -> Cpu {
        Cpu::with_rng(&Config::default(), Box::new(StepRng::new(0, 1))).unwrap()
    }

    fn cpu_with(program: &[u8]) -> Cpu {
        let mut cpu = cpu();
        cpu.load(program).unwrap();
        cpu
    }

    #[test]
    fn font_is_in_rom() {
        let cpu = cpu();
        assert_eq!(FONT.to_vec(), cpu.memory().get_bytes(0, FONT.len()).unwrap());
        assert!(cpu.memory().get_byte(0x000).is_ok());
    }

    #[test]
    fn clipping_is_rejected_up_front() {
        let config = Config {
            quirks: Quirks { display_mode: DisplayMode::Clipping, ..Quirks::default() },
            ..Config::default()
        };
        assert!(matches!(Cpu::new(&config), Err(Error::NotImplemented { .. })));
    }

    #[test]
    fn oversized_program_is_rejected() {
        let mut cpu = cpu();
        let program = vec![0; PROGRAM_SIZE + 1];
        assert!(matches!(cpu.load(&program), Err(Error::SegmentBoundaryViolation { .. })));
        assert!(cpu.load(&vec![0; PROGRAM_SIZE]).is_ok());
    }

    #[test]
    fn store_is_not_implemented() {
        assert!(matches!(cpu().store(), Err(Error::NotImplemented { .. })));
    }

    #[test]
    fn cycle_runs_a_program() {
        let mut cpu = cpu_with(&[0x61, 0x05, 0x71, 0x03, 0x33, 0x08]);
        for _ in 0..3 {
            cpu.cycle().unwrap();
        }
        assert_eq!(8, cpu.registers().v(1));
        assert_eq!(PROGRAM_START + 6, cpu.registers().program_counter.get());
    }

    #[test]
    fn cycle_does_nothing_unless_operating() {
        let mut cpu = cpu_with(&[0x61, 0x05]);
        cpu.halt();
        cpu.cycle().unwrap();
        assert_eq!(0, cpu.registers().v(1));
        assert_eq!(PROGRAM_START, cpu.registers().program_counter.get());
    }

    #[test]
    fn execute_many_runs_manually_given_instructions() {
        let mut cpu = cpu();
        cpu.execute_many(&[0x1250, 0x6A23, 0x8BA0]).unwrap();
        assert_eq!(0x254, cpu.registers().program_counter.get());
        assert_eq!(0x23, cpu.registers().v(0xB));
    }

    #[test]
    fn timers_saturate_at_zero() {
        let mut cpu = cpu();
        cpu.registers().delay_timer.set(5);
        for _ in 0..6 {
            cpu.delay_tick();
        }
        assert_eq!(0, cpu.registers().delay_timer.get());
    }

    #[test]
    fn timers_freeze_when_the_clock_stops() {
        let mut cpu = cpu();
        cpu.registers().sound_timer.set(3);
        cpu.halt();
        cpu.sound_tick();
        assert_eq!(2, cpu.registers().sound_timer.get());
        cpu.cont();
        cpu.stop_clock();
        cpu.sound_tick();
        assert_eq!(2, cpu.registers().sound_timer.get());
    }

    #[test]
    fn key_input_restarts_a_stopped_clock() {
        let mut cpu = cpu();
        cpu.stop_clock();
        cpu.key_pressed(3);
        cpu.update_key_state(1 << 3);
        assert_eq!(CpuState::Operating, cpu.state());
        assert_eq!(3, cpu.registers().key.get());
    }

    #[test]
    fn render_sends_merged_changes_once() {
        let mut cpu = cpu();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut receiver = move |change: GraphicChange, framebuffer: &Framebuffer| {
            sink.borrow_mut().push((change, framebuffer.pixel(0, 0)));
        };

        // Font glyph 0 drawn at the top left.
        cpu.execute_many(&[0xA000, 0xD015]).unwrap();
        cpu.execute(0x00E0).unwrap();
        assert!(cpu.render(&mut receiver));
        assert!(!cpu.render(&mut receiver));

        assert_eq!(vec![(GraphicChange::Mix, false)], *seen.borrow());
    }

    #[test]
    fn noop_draw_is_not_rendered() {
        let mut cpu = cpu();
        // I points at zeroed interpreter ROM past the font.
        cpu.execute_many(&[0xA100, 0xD015]).unwrap();
        assert_eq!(GraphicChange::Noop, cpu.registers().graphic_change.get());
        assert!(!cpu.render(&mut |_: GraphicChange, _: &Framebuffer| {}));
    }

    #[test]
    fn sound_edges_reach_the_audio_port() {
        let mut cpu = cpu();
        let edges = Rc::new(RefCell::new(Vec::new()));
        let sink = edges.clone();
        cpu.attach_audio(move |on: bool| sink.borrow_mut().push(on));

        cpu.registers().sound_timer.set(3);
        for _ in 0..3 {
            cpu.sound_tick();
        }
        assert_eq!(vec![true, false], *edges.borrow());
    }

    #[test]
    fn reset_keeps_the_program() {
        let mut cpu = cpu_with(&[0x61, 0x05]);
        cpu.cycle().unwrap();
        cpu.reset();
        assert_eq!(0, cpu.registers().v(1));
        assert_eq!(0x6105, cpu.memory().get_word(PROGRAM_START).unwrap());
    }
}
