use std::fmt::Display;

use crate::error::VmError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cpu {
    pub a: i64,    // The control register, consumed three bits per loop
    pub b: i64,
    pub c: i64,
    pub pc: usize, // Index of the next opcode on the tape
}

impl Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cpu [ a: {}, b: {}, c: {}, pc: {} ]", self.a, self.b, self.c, self.pc)
    }
}

impl Cpu {
    pub fn new(a: i64, b: i64, c: i64) -> Self {
        Cpu { a, b, c, pc: 0 }
    }

    /// Resolves a combo operand against the registers as they are right now.
    pub fn combo(&self, operand: u8) -> Result<i64, VmError> {
        match operand {
            0..=3 => Ok(operand as i64),
            4 => Ok(self.a),
            5 => Ok(self.b),
            6 => Ok(self.c),
            _ => Err(VmError::ReservedOperand {
                operand,
                pc: self.pc,
            }),
        }
    }

    /// `A / 2^shift`, truncating toward zero. Shifts of 64 or more leave nothing.
    pub fn divide_a(&self, shift: i64) -> Result<i64, VmError> {
        if shift < 0 {
            return Err(VmError::NegativeShift {
                shift,
                pc: self.pc,
            });
        }
        if shift >= 64 {
            return Ok(0);
        }
        Ok((self.a as i128 / (1i128 << shift)) as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    ADV = 0, // A = A >> combo
    BXL = 1, // B = B ^ literal
    BST = 2, // B = combo % 8
    JNZ = 3, // if A != 0 then PC = literal
    BXC = 4, // B = B ^ C, operand ignored
    OUT = 5, // emit combo % 8
    BDV = 6, // B = A >> combo
    CDV = 7, // C = A >> combo
}

impl OpCode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::ADV => "adv",
            OpCode::BXL => "bxl",
            OpCode::BST => "bst",
            OpCode::JNZ => "jnz",
            OpCode::BXC => "bxc",
            OpCode::OUT => "out",
            OpCode::BDV => "bdv",
            OpCode::CDV => "cdv",
        }
    }

    pub fn takes_combo(self) -> bool {
        !matches!(self, OpCode::BXL | OpCode::JNZ | OpCode::BXC)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::ADV),
            1 => Ok(Self::BXL),
            2 => Ok(Self::BST),
            3 => Ok(Self::JNZ),
            4 => Ok(Self::BXC),
            5 => Ok(Self::OUT),
            6 => Ok(Self::BDV),
            7 => Ok(Self::CDV),
            _ => Err(v),
        }
    }
}

/// A decoded (opcode, operand) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: u8,
}

impl Instruction {
    pub fn decode(opcode: u8, operand: u8, pc: usize) -> Result<Self, VmError> {
        let opcode =
            OpCode::try_from(opcode).map_err(|opcode| VmError::InvalidOpcode { opcode, pc })?;
        Ok(Instruction { opcode, operand })
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mnemonic = self.opcode.mnemonic();
        if self.opcode == OpCode::BXC {
            return write!(f, "{}", mnemonic);
        }
        if !self.opcode.takes_combo() {
            return write!(f, "{} {}", mnemonic, self.operand);
        }
        match self.operand {
            4 => write!(f, "{} a", mnemonic),
            5 => write!(f, "{} b", mnemonic),
            6 => write!(f, "{} c", mnemonic),
            n => write!(f, "{} {}", mnemonic, n),
        }
    }
}
