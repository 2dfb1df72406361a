//! A CPU running on its own thread.
//!
//! The board thread builds and owns the [`Cpu`]; nothing else ever touches its
//! registers or memory. Everything from the outside arrives as a [`Command`]
//! over a channel and is applied between two activities, never during one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::emulator::clock::{Activity, Scheduler};
use crate::emulator::config::{check_frequency, Config};
use crate::emulator::cpu::Cpu;
use crate::emulator::error::{Error, Result};
use crate::emulator::input::KeyPort;
use crate::emulator::output::{AudioReceiver, DisplayReceiver};
use crate::emulator::register::CpuState;

#[derive(Debug)]
pub enum Command {
    UpdateKeyState(u16),
    KeyPressed(u8),
    SetFrequency(Activity, f64),
    /// Reply with the current rate of an activity, `None` when it is not scheduled.
    Frequency(Activity, Sender<Option<f64>>),
    Halt,
    Continue,
    StopClock,
    StartClock,
    Sleep,
    Wake,
    Stop,
}

/// Whether `activity` may run while the CPU is in `state`.
fn runs_in(activity: Activity, state: CpuState) -> bool {
    match state {
        CpuState::Operating => true,
        CpuState::Halt => activity != Activity::Cycle,
        CpuState::StopClock | CpuState::Sleep => false,
    }
}

pub struct Board<D: DisplayReceiver> {
    cpu: Cpu,
    scheduler: Scheduler,
    display: D,
    render_each_cycle: bool,
}

impl<D: DisplayReceiver> Board<D> {
    /// Start a board thread running `program`.
    ///
    /// Returns once the CPU is built and the program loaded, so a bad
    /// configuration or an oversized program is reported here.
    pub fn spawn<A>(config: Config, program: Vec<u8>, display: D, audio: A) -> Result<BoardHandle>
    where
        D: Send + 'static,
        A: AudioReceiver + Send + 'static,
    {
        config.validate()?;
        let (commands, receiver) = mpsc::channel();
        let (ready_sender, ready) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let still_running = running.clone();

        let thread = thread::Builder::new()
            .name("chip-8 board".to_string())
            .spawn(move || {
                let _running = RunningFlag(still_running);
                let mut board = match Board::new(&config, &program, display, audio) {
                    Ok(board) => {
                        let _ = ready_sender.send(Ok(()));
                        board
                    }
                    Err(error) => {
                        let _ = ready_sender.send(Err(error.clone()));
                        return Err(error);
                    }
                };
                board.run(&receiver)
            })
            .map_err(|error| {
                log::error!("Could not start board thread: {}", error);
                Error::BoardStopped
            })?;

        match ready.recv() {
            Ok(Ok(())) => Ok(BoardHandle { commands, running, thread: Some(thread) }),
            Ok(Err(error)) => {
                let _ = thread.join();
                Err(error)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::BoardStopped)
            }
        }
    }

    fn new<A: AudioReceiver + 'static>(config: &Config, program: &[u8], display: D, audio: A) -> Result<Board<D>> {
        let mut cpu = Cpu::new(config)?;
        cpu.load(program)?;
        cpu.attach_audio(audio);
        Ok(Board {
            cpu,
            scheduler: Scheduler::new(&config.frequencies)?,
            display,
            render_each_cycle: config.frequencies.render.is_none(),
        })
    }

    fn run(&mut self, commands: &Receiver<Command>) -> Result<()> {
        self.scheduler.start(Instant::now());
        log::debug!("Board started");

        let result = self.run_until_stopped(commands);
        self.scheduler.stop();
        match &result {
            Ok(()) => log::debug!("Board stopped"),
            Err(error) => log::error!("Board stopped: {}", error),
        }
        result
    }

    fn run_until_stopped(&mut self, commands: &Receiver<Command>) -> Result<()> {
        loop {
            self.run_due(Instant::now())?;

            let state = self.cpu.state();
            let command = match self.scheduler.next_due(|activity| runs_in(activity, state)) {
                Some(due) => commands.recv_timeout(due.saturating_duration_since(Instant::now())),
                // Nothing to do until someone sends a key or a wake up.
                None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match command {
                Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => return Ok(()),
                Ok(command) => self.apply(command)?,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    /// Run everything due at `now`, re-checking the run state after each activity.
    fn run_due(&mut self, now: Instant) -> Result<()> {
        loop {
            let state = self.cpu.state();
            match self.scheduler.pop_due(now, |activity| runs_in(activity, state)) {
                Some(activity) => self.perform(activity)?,
                None => return Ok(()),
            }
        }
    }

    fn perform(&mut self, activity: Activity) -> Result<()> {
        match activity {
            Activity::Cycle => {
                self.cpu.cycle()?;
                if self.render_each_cycle {
                    self.cpu.render(&mut self.display);
                }
            }
            Activity::DelayTick => self.cpu.delay_tick(),
            Activity::SoundTick => self.cpu.sound_tick(),
            Activity::Render => {
                self.cpu.render(&mut self.display);
            }
        }
        Ok(())
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        log::trace!("Board command {:?}", command);
        match command {
            Command::UpdateKeyState(state) => self.cpu.update_key_state(state),
            Command::KeyPressed(key) => self.cpu.key_pressed(key),
            Command::SetFrequency(activity, frequency) => {
                self.scheduler.set_frequency(activity, frequency, Instant::now())?;
                if activity == Activity::Render {
                    self.render_each_cycle = false;
                }
            }
            Command::Frequency(activity, reply) => {
                let _ = reply.send(self.scheduler.frequency(activity));
            }
            Command::Halt => {
                self.cpu.halt();
            }
            Command::Continue => {
                self.cpu.cont();
            }
            Command::StopClock => {
                self.cpu.stop_clock();
            }
            Command::StartClock => {
                self.cpu.start_clock();
            }
            Command::Sleep => {
                self.cpu.sleep();
            }
            Command::Wake => {
                self.cpu.wake_up();
            }
            Command::Stop => {}
        }
        Ok(())
    }
}

/// Clears the flag when the board thread ends, however it ends.
struct RunningFlag(Arc<AtomicBool>);

impl Drop for RunningFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The outside end of a running board.
pub struct BoardHandle {
    commands: Sender<Command>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl BoardHandle {
    pub fn send(&self, command: Command) -> Result<()> {
        if self.thread.is_none() {
            return Err(Error::BoardStopped);
        }
        self.commands.send(command).map_err(|_| Error::BoardStopped)
    }

    /// Change the rate of an activity while the board runs.
    pub fn set_frequency(&self, activity: Activity, frequency: f64) -> Result<()> {
        check_frequency(activity.name(), frequency)?;
        self.send(Command::SetFrequency(activity, frequency))
    }

    /// The rate of an activity, `None` for a render rate that was never set.
    pub fn frequency(&self, activity: Activity) -> Result<Option<f64>> {
        let (reply, frequency) = mpsc::channel();
        self.send(Command::Frequency(activity, reply))?;
        frequency.recv().map_err(|_| Error::BoardStopped)
    }

    /// Stop executing instructions. Timers and rendering go on.
    pub fn halt(&self) -> Result<()> {
        self.send(Command::Halt)
    }

    pub fn cont(&self) -> Result<()> {
        self.send(Command::Continue)
    }

    /// Freeze instructions and timers until `start_clock` or a key.
    pub fn stop_clock(&self) -> Result<()> {
        self.send(Command::StopClock)
    }

    pub fn start_clock(&self) -> Result<()> {
        self.send(Command::StartClock)
    }

    /// Freeze everything until `wake_up`. Keys do not wake a sleeping CPU.
    pub fn sleep(&self) -> Result<()> {
        self.send(Command::Sleep)
    }

    /// Resume a sleeping CPU.
    pub fn wake_up(&self) -> Result<()> {
        self.send(Command::Wake)
    }

    /// Whether the board was stopped or stopped by itself on an error.
    pub fn is_stopped(&self) -> bool {
        self.thread.is_none() || !self.running.load(Ordering::SeqCst)
    }

    /// Stop the board and wait for its thread. Returns the error that stopped
    /// it, if one did. Stopping a stopped board does nothing.
    pub fn stop(&mut self) -> Result<()> {
        let thread = match self.thread.take() {
            Some(thread) => thread,
            None => return Ok(()),
        };
        // The thread may already be gone after a fatal error.
        let _ = self.commands.send(Command::Stop);
        thread.join().map_err(|_| {
            log::error!("Board thread panicked");
            Error::BoardStopped
        })?
    }
}

impl KeyPort for BoardHandle {
    fn update_key_state(&mut self, state: u16) {
        if let Err(error) = self.send(Command::UpdateKeyState(state)) {
            log::warn!("Dropped key state {:#06x}: {}", state, error);
        }
    }

    fn key_pressed(&mut self, key: u8) {
        if let Err(error) = self.send(Command::KeyPressed(key)) {
            log::warn!("Dropped key {:x}: {}", key, error);
        }
    }
}

impl Drop for BoardHandle {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            log::error!("{}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(CpuState::Operating, Activity::Cycle => true)]
    #[test_case(CpuState::Halt, Activity::Cycle => false)]
    #[test_case(CpuState::Halt, Activity::DelayTick => true)]
    #[test_case(CpuState::Halt, Activity::Render => true)]
    #[test_case(CpuState::StopClock, Activity::SoundTick => false)]
    #[test_case(CpuState::Sleep, Activity::Render => false)]
    fn activity_gating(state: CpuState, activity: Activity) -> bool {
        runs_in(activity, state)
    }
}
