pub mod cpu;
pub mod error;
pub mod memory;
pub mod program;
pub mod reproducer;

use std::fmt::Display;

use cpu::{Cpu, Instruction, OpCode};
use log::{debug, log_enabled, trace, warn, Level};
use memory::{Addressable, Tape};

pub use error::{SearchError, VmError};
pub use program::Program;
pub use reproducer::{Reproducer, SearchConfig};

/// Ticks allowed before a run is declared non-terminating.
pub const MAX_STEPS: u64 = 100_000;

/// Values emitted by `out`, in order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Output(pub Vec<u8>);

impl Output {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, value) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

pub struct Machine {
    cpu: Cpu,
    tape: Tape,
    output: Vec<u8>,
    steps: u64,
    step_limit: u64,
    halted: bool,
}

impl Machine {
    pub fn new(program: &Program) -> Self {
        Self::with_step_limit(program, MAX_STEPS)
    }

    pub fn with_step_limit(program: &Program, step_limit: u64) -> Self {
        Self {
            cpu: Cpu::new(program.initial_a, program.initial_b, program.initial_c),
            tape: Tape::new(program.data.clone()),
            output: Vec::new(),
            steps: 0,
            step_limit,
            halted: false,
        }
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn into_output(self) -> Output {
        Output(self.output)
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn debug_state(&self) {
        if !log_enabled!(Level::Debug) {
            return;
        }
        let next_pair = self
            .tape
            .fetch_pair(self.cpu.pc)
            .map(|(op, arg)| format!("{:#04x} {:#04x}", op, arg))
            .unwrap_or_else(|| {
                if self.tape.is_empty() {
                    "<empty tape>".to_string()
                } else {
                    "<end>".to_string()
                }
            });
        debug!(
            "State: {} | steps: {} | tape: {} cells | next: {} | output: {}",
            self.cpu,
            self.steps,
            self.tape.len(),
            next_pair,
            self.output.len()
        );
    }

    /// Applies one instruction. Returns `true` when it moved the program counter itself.
    fn execute(&mut self, instr: Instruction) -> Result<bool, VmError> {
        let operand = instr.operand;
        match instr.opcode {
            OpCode::ADV => {
                self.cpu.a = self.cpu.divide_a(self.cpu.combo(operand)?)?;
            }
            OpCode::BXL => {
                self.cpu.b ^= operand as i64;
            }
            OpCode::BST => {
                self.cpu.b = self.cpu.combo(operand)?.rem_euclid(8);
            }
            OpCode::JNZ => {
                if self.cpu.a != 0 {
                    self.cpu.pc = operand as usize;
                    return Ok(true);
                }
            }
            OpCode::BXC => {
                self.cpu.b ^= self.cpu.c;
            }
            OpCode::OUT => {
                let value = self.cpu.combo(operand)?.rem_euclid(8);
                self.output.push(value as u8);
            }
            OpCode::BDV => {
                self.cpu.b = self.cpu.divide_a(self.cpu.combo(operand)?)?;
            }
            OpCode::CDV => {
                self.cpu.c = self.cpu.divide_a(self.cpu.combo(operand)?)?;
            }
        }
        Ok(false)
    }

    /// Executes a single instruction. `Ok(false)` means the machine has halted.
    pub fn tick(&mut self) -> Result<bool, VmError> {
        let Some((opcode, operand)) = self.tape.fetch_pair(self.cpu.pc) else {
            self.halted = true;
            return Ok(false);
        };

        let instr = Instruction::decode(opcode, operand, self.cpu.pc)?;
        trace!("{:#04x}: {:<6} | {}", self.cpu.pc, instr.to_string(), self.cpu);

        if !self.execute(instr)? {
            self.cpu.pc += 2;
        }

        self.steps += 1;
        if self.steps > self.step_limit {
            warn!("step limit of {} exceeded at pc {}", self.step_limit, self.cpu.pc);
            return Err(VmError::RunawayExecution { steps: self.steps });
        }

        Ok(true)
    }

    /// Runs until the tape is exhausted and returns everything emitted.
    pub fn run(&mut self) -> Result<&[u8], VmError> {
        while self.tick()? {}
        self.debug_state();
        Ok(&self.output)
    }
}

/// Runs `program` to completion on a fresh machine.
pub fn execute(program: &Program) -> Result<Output, VmError> {
    let mut machine = Machine::new(program);
    machine.run()?;
    Ok(machine.into_output())
}

#[cfg(test)]
mod tests {

    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    pub fn scenario_example_output() {
        init();
        let prog = Program::new(vec![0, 1, 5, 4, 3, 0], 729, 0, 0);
        let output = execute(&prog).unwrap();
        assert_eq!(output.as_slice(), &[4, 6, 3, 5, 6, 3, 5, 2, 1, 0]);
        assert_eq!(output.to_string(), "4,6,3,5,6,3,5,2,1,0");
    }

    #[test]
    pub fn scenario_register_effects() {
        init();
        // bst c; bxl 5; bxc; cdv 2
        let prog = Program::new(vec![2, 6, 1, 5, 4, 0, 7, 2], 41, 0, 9);
        let mut vm = Machine::new(&prog);
        vm.run().unwrap();
        assert_eq!(vm.cpu(), &Cpu { a: 41, b: 13, c: 10, pc: 8 });
    }

    #[test]
    pub fn scenario_invalid_opcode() {
        init();
        let prog = Program::new(vec![5, 1, 8, 0], 0, 0, 0);
        let mut vm = Machine::new(&prog);
        assert_eq!(vm.run(), Err(VmError::InvalidOpcode { opcode: 8, pc: 2 }));
        assert!(!vm.is_halted());
    }

    #[test]
    pub fn scenario_reserved_operand() {
        init();
        let prog = Program::new(vec![5, 7], 0, 0, 0);
        assert_eq!(
            execute(&prog),
            Err(VmError::ReservedOperand { operand: 7, pc: 0 })
        );
    }

    #[test]
    pub fn scenario_runaway_loop() {
        init();
        let prog = Program::new(vec![3, 0], 1, 0, 0);
        let mut vm = Machine::new(&prog);
        assert_eq!(
            vm.run(),
            Err(VmError::RunawayExecution {
                steps: MAX_STEPS + 1
            })
        );
        assert_eq!(vm.steps(), MAX_STEPS + 1);
    }

    #[test]
    pub fn runaway_never_fires_early() {
        init();
        let prog = Program::new(vec![3, 0], 1, 0, 0);
        let mut vm = Machine::with_step_limit(&prog, 10);
        for _ in 0..10 {
            assert_eq!(vm.tick(), Ok(true));
        }
        assert_eq!(vm.tick(), Err(VmError::RunawayExecution { steps: 11 }));

        // adv 1; jnz 0 with A = 2 takes exactly four ticks
        let prog = Program::new(vec![0, 1, 3, 0], 2, 0, 0);
        let mut vm = Machine::with_step_limit(&prog, 4);
        assert!(vm.run().is_ok());
        assert_eq!(vm.steps(), 4);

        let mut vm = Machine::with_step_limit(&prog.with_register_a(4), 4);
        assert_eq!(vm.run(), Err(VmError::RunawayExecution { steps: 5 }));
    }

    #[test]
    pub fn halts_at_tape_end() {
        init();
        let prog = Program::new(vec![1, 7], 0, 3, 0);
        let mut vm = Machine::new(&prog);
        assert_eq!(vm.tick(), Ok(true));
        assert_eq!(vm.tick(), Ok(false));
        assert!(vm.is_halted());
        assert_eq!(vm.cpu().pc, 2);
        assert_eq!(vm.cpu().b, 4);

        // A dangling opcode without its operand is never decoded
        let prog = Program::new(vec![5, 4, 8], 6, 0, 0);
        let mut vm = Machine::new(&prog);
        assert_eq!(vm.run(), Ok(&[6u8][..]));
        assert_eq!(vm.steps(), 1);
    }

    #[test]
    pub fn jump_past_end_halts() {
        init();
        let prog = Program::new(vec![3, 7, 5, 4], 1, 0, 0);
        let mut vm = Machine::new(&prog);
        assert!(vm.run().unwrap().is_empty());
        assert_eq!(vm.cpu().pc, 7);
    }

    #[test]
    pub fn combo_reads_current_registers() {
        init();
        // adv 1; out a
        let prog = Program::new(vec![0, 1, 5, 4], 10, 0, 0);
        assert_eq!(execute(&prog).unwrap().as_slice(), &[5]);

        // bst a; out b
        let prog = Program::new(vec![2, 4, 5, 5], 13, 0, 0);
        assert_eq!(execute(&prog).unwrap().as_slice(), &[5]);

        // cdv 0; out c; bdv c; out b
        let prog = Program::new(vec![7, 0, 5, 6, 6, 6, 5, 5], 64, 0, 0);
        assert_eq!(execute(&prog).unwrap().as_slice(), &[0, 0]);
    }

    #[test]
    pub fn negative_registers_emit_in_range() {
        init();
        let prog = Program::new(vec![5, 5, 2, 6, 5, 5], 0, -3, -11);
        assert_eq!(execute(&prog).unwrap().as_slice(), &[5, 5]);

        let prog = Program::new(vec![6, 5], 8, -1, 0);
        assert_eq!(
            execute(&prog),
            Err(VmError::NegativeShift { shift: -1, pc: 0 })
        );
    }

    #[test]
    pub fn oversized_shift_clears_register() {
        init();
        // bdv 0; adv b; out a
        let prog = Program::new(vec![6, 0, 0, 5, 5, 4], 1 << 33, 0, 0);
        assert_eq!(execute(&prog).unwrap().as_slice(), &[0]);

        // cdv 0; bdv c; out b
        let prog = Program::new(vec![7, 0, 6, 6, 5, 5], i64::MAX, 0, 0);
        assert_eq!(execute(&prog).unwrap().as_slice(), &[0]);
    }

    #[test]
    pub fn empty_tape_halts_immediately() {
        init();
        let mut vm = Machine::new(&Program::new(vec![], 7, 0, 0));
        assert!(vm.run().unwrap().is_empty());
        assert!(vm.is_halted());
        assert_eq!(vm.steps(), 0);
    }

    #[test]
    pub fn runs_are_deterministic() {
        init();
        let prog = Program::new(vec![2, 4, 1, 3, 7, 5, 4, 1, 1, 3, 0, 3, 5, 5, 3, 0], 0, 0, 0);
        for a in [1, 729, 117_440, 46_337_277, 1 << 44] {
            let prog = prog.with_register_a(a);
            assert_eq!(execute(&prog), execute(&prog));
        }
    }

    #[test]
    pub fn empty_output_renders_empty() {
        assert_eq!(Output::default().to_string(), "");
        assert_eq!(Output(vec![7]).to_string(), "7");
    }
}
