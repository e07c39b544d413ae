pub trait Addressable<T> {
    fn read(&self, address: usize) -> Option<T>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only program tape of 3-bit cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    data: Vec<u8>,
}

impl Tape {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// The (opcode, operand) pair starting at `address`, if the tape holds both cells.
    pub fn fetch_pair(&self, address: usize) -> Option<(u8, u8)> {
        let opcode = self.read(address)?;
        let operand = self.read(address.checked_add(1)?)?;
        Some((opcode, operand))
    }
}

impl Addressable<u8> for Tape {
    fn read(&self, address: usize) -> Option<u8> {
        self.data.get(address).copied()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_requires_full_pair() {
        let tape = Tape::new(vec![0, 3, 5]);
        assert_eq!(tape.fetch_pair(0), Some((0, 3)));
        assert_eq!(tape.fetch_pair(1), Some((3, 5)));
        assert_eq!(tape.fetch_pair(2), None);
        assert_eq!(tape.fetch_pair(usize::MAX), None);
    }
}
