//! Search for the value of `A` that makes a program print itself.
//!
//! The programs this works on shift `A` right by three bits exactly once per loop and emit
//! one value per loop, so the last output only depends on the highest octal digit of `A`,
//! the one before it on the two highest digits, and so on. The search fixes digits from
//! the most significant end: once `A` reproduces the last `k` values, `A * 8` plus a small
//! offset is the first candidate for the last `k + 1`.

use caches::Cache;
use log::{debug, info};

use crate::cpu::{Instruction, OpCode};
use crate::error::SearchError;
use crate::program::Program;
use crate::{Machine, MAX_STEPS};

pub const DEFAULT_CACHE_SIZE: usize = 32;
pub const DEFAULT_MAX_CANDIDATES: u64 = 1 << 20;

type SuffixCache = caches::AdaptiveCache<Vec<u8>, i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Candidates tried per digit before giving up.
    pub max_candidates: u64,
    /// Step limit for every candidate run.
    pub max_steps: u64,
    /// Number of solved suffixes kept between searches.
    pub cache_size: usize,
    /// Reject programs that do not consume `A` three bits per output.
    pub check_shape: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            max_steps: MAX_STEPS,
            cache_size: DEFAULT_CACHE_SIZE,
            check_shape: true,
        }
    }
}

pub struct Reproducer {
    program: Program,
    config: SearchConfig,
    cache: SuffixCache,
    runs: u64,
}

impl Reproducer {
    pub fn new(program: Program) -> Result<Self, SearchError> {
        Self::with_config(program, SearchConfig::default())
    }

    pub fn with_config(program: Program, config: SearchConfig) -> Result<Self, SearchError> {
        let cache = SuffixCache::new(config.cache_size)
            .map_err(|_| SearchError::InvalidCacheSize(config.cache_size))?;
        Ok(Self {
            program,
            config,
            cache,
            runs: 0,
        })
    }

    /// Machine runs performed so far, across all searches.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Smallest non-negative `A` whose output is the program itself.
    pub fn minimal_register_a(&mut self) -> Result<i64, SearchError> {
        if self.config.check_shape {
            check_shape(&self.program.data)?;
        }

        let target = self.program.data.clone();
        let a = self.solve(&target)?;
        info!("A = {} reproduces the program after {} runs", a, self.runs);
        Ok(a)
    }

    fn solve(&mut self, suffix: &[u8]) -> Result<i64, SearchError> {
        if suffix.is_empty() {
            return Ok(0);
        }

        let key = suffix.to_vec();
        if let Some(a) = self.cache.get_mut(&key).copied() {
            debug!("suffix of length {} already solved: {}", suffix.len(), a);
            return Ok(a);
        }

        let suffix_len = suffix.len();
        let start = self
            .solve(&suffix[1..])?
            .checked_mul(8)
            .ok_or(SearchError::CandidateOverflow { suffix_len })?;

        for offset in 0..self.config.max_candidates {
            let a = i64::try_from(offset)
                .ok()
                .and_then(|offset| start.checked_add(offset))
                .ok_or(SearchError::CandidateOverflow { suffix_len })?;

            if self.reproduces(a, suffix)? {
                debug!("last {} values reproduced by A = {:#o}", suffix_len, a);
                self.cache.put(key, a);
                return Ok(a);
            }
        }

        Err(SearchError::NoSolutionFound { suffix_len, start })
    }

    fn reproduces(&mut self, a: i64, expected: &[u8]) -> Result<bool, SearchError> {
        self.runs += 1;
        let program = self.program.with_register_a(a);
        let mut machine = Machine::with_step_limit(&program, self.config.max_steps);
        Ok(machine.run()? == expected)
    }
}

/// Checks that `data` is a single loop ending in `jnz 0`, with one `out` and `adv 3` as
/// its only write to `A`.
pub fn check_shape(data: &[u8]) -> Result<(), SearchError> {
    let unsupported = |reason: &str| Err(SearchError::UnsupportedProgram(reason.to_string()));

    if data.len() % 2 != 0 {
        return unsupported("tape has a dangling opcode");
    }

    let instructions = data
        .chunks_exact(2)
        .enumerate()
        .map(|(index, pair)| Instruction::decode(pair[0], pair[1], index * 2))
        .collect::<Result<Vec<_>, _>>()?;

    match instructions.last() {
        Some(Instruction {
            opcode: OpCode::JNZ,
            operand: 0,
        }) => {}
        _ => return unsupported("program does not end with `jnz 0`"),
    }

    let outputs = instructions
        .iter()
        .filter(|instr| instr.opcode == OpCode::OUT)
        .count();
    if outputs != 1 {
        return unsupported("loop must emit exactly one value");
    }

    let writes_to_a: Vec<_> = instructions
        .iter()
        .filter(|instr| instr.opcode == OpCode::ADV)
        .collect();
    match writes_to_a.as_slice() {
        [Instruction { operand: 3, .. }] => Ok(()),
        [_] => unsupported("A must be shifted by exactly three bits"),
        _ => unsupported("A must be shifted exactly once per loop"),
    }
}
