use thiserror::Error;

/// Fatal conditions raised while executing a program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("invalid opcode {opcode} at pc {pc}")]
    InvalidOpcode { opcode: u8, pc: usize },

    #[error("reserved combo operand {operand} at pc {pc}")]
    ReservedOperand { operand: u8, pc: usize },

    #[error("execution did not halt after {steps} steps")]
    RunawayExecution { steps: u64 },

    #[error("negative shift {shift} at pc {pc}")]
    NegativeShift { shift: i64, pc: usize },
}

/// Failures of the self-reproduction search.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("no value of A reproduces the last {suffix_len} values (searched from {start})")]
    NoSolutionFound { suffix_len: usize, start: i64 },

    #[error("program cannot be searched: {0}")]
    UnsupportedProgram(String),

    #[error("candidate for the last {suffix_len} values overflows the register")]
    CandidateOverflow { suffix_len: usize },

    #[error("invalid cache size {0}")]
    InvalidCacheSize(usize),

    #[error(transparent)]
    Machine(#[from] VmError),
}
