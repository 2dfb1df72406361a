/*!

A CHIP-8 virtual machine as specified at https://en.wikipedia.org/wiki/CHIP-8.

The interpreter is modelled as a small computer: a register file, a
memory map of segments, a decoder and a set of execution units
(ALU, address generation, load/store, stack and a sprite GPU), all
driven by independently clocked activities.

# Crossterm Frontend

If you want to try the emulator on some programs, there is a ready-to-use implementation
you can run by using `cargo run --release --bin crossterm_frontend -- <program>`.
The keys 0-9 and a-f are the hex keypad, `q` quits. Pass `--help` to see the quirk and clock settings.

# Library

The main way of running a program is to load it as bytes and cycle the CPU.

```rust
use chip_8::emulator::{Config, Cpu};

let mut cpu = Cpu::new(&Config::default()).unwrap();

// Load a program at address 0x200.
cpu.load(&[0x61, 0x05, 0x71, 0x03]).unwrap();
cpu.cycle().unwrap();
cpu.cycle().unwrap();
assert_eq!(8, cpu.registers().v(1));
```

Alternatively, you can experiment by executing instructions manually.

```rust
use chip_8::emulator::{Config, Cpu};

let mut cpu = Cpu::new(&Config::default()).unwrap();

// Execute instructions manually
cpu.execute(0x00E0).unwrap();

// Or many sequentially
cpu.execute_many(&[0x1250, 0x6A23, 0x8BA0]).unwrap();
assert_eq!(0x23, cpu.registers().v(0xB));
```

## Running on a thread

A `Board` owns a CPU on its own thread and runs the cycle, the two timers and
optionally the display at their configured rates. Give it somewhere to send
frames and sound, then feed it keys through the `KeyPort` of the handle.

```no_run
use chip_8::emulator::{Board, Config, Framebuffer, GraphicChange, KeyPort};

let program = std::fs::read("pong.ch8").unwrap();
let display = |_: GraphicChange, framebuffer: &Framebuffer| println!("{}", framebuffer);
let audio = |on: bool| println!("beep: {}", on);

let mut board = Board::spawn(Config::default(), program, display, audio).unwrap();
board.key_pressed(0x5);
board.update_key_state(1 << 0x5);
board.stop().unwrap();
```
*/

pub mod cli;
pub mod emulator;
pub mod util;
