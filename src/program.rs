#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub data: Vec<u8>,
    pub initial_a: i64,
    pub initial_b: i64,
    pub initial_c: i64,
}

impl Program {
    pub fn new(data: Vec<u8>, initial_a: i64, initial_b: i64, initial_c: i64) -> Self {
        Self {
            data,
            initial_a,
            initial_b,
            initial_c,
        }
    }

    /// Same tape and `B`/`C`, different starting `A`.
    pub fn with_register_a(&self, a: i64) -> Self {
        Self {
            initial_a: a,
            ..self.clone()
        }
    }
}
