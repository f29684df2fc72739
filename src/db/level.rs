//! Transaction nesting counter.
//!
//! Several logical transactions share one physical transaction. The counter
//! decides, for each logical begin/commit/rollback, whether the driver has to
//! be contacted at all:
//!
//! ```text
//! Idle(0) --enter--> Open(1)           physical begin
//! Open(n) --enter--> Open(n+1)         nested, no driver call
//! Open(n>1) --leave--> Open(n-1)       nested, no driver call
//! Open(1) --leave--> Idle(0)           physical commit/rollback
//! any --leave below 0--> Corrupt(n<0)  integrity error, forever
//! ```
//!
//! `Corrupt` has no way back. Once the counter is negative every `enter` and
//! `leave` fails; the owning adapter has to be replaced.

/// What a successful `enter`/`leave` requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Only the counter moved.
    Nested,
    /// The outermost boundary was crossed; the driver must be called.
    Physical,
}

/// Observable state of the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelState {
    Idle,
    Open(i64),
    Corrupt(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionLevel {
    level: i64,
}

impl TransactionLevel {
    pub fn new() -> Self {
        Self { level: 0 }
    }

    pub fn get(&self) -> i64 {
        self.level
    }

    pub fn state(&self) -> LevelState {
        match self.level {
            0 => LevelState::Idle,
            n if n > 0 => LevelState::Open(n),
            n => LevelState::Corrupt(n),
        }
    }

    /// Register a logical begin.
    ///
    /// A negative counter is rejected without being touched. On
    /// `Step::Physical` the counter is already 1 when this returns, so a
    /// failing physical begin leaves it there.
    pub fn enter(&mut self) -> Result<Step, i64> {
        if self.level > 0 {
            self.level += 1;
            return Ok(Step::Nested);
        }

        if self.level < 0 {
            return Err(self.level);
        }

        self.level += 1;
        Ok(Step::Physical)
    }

    /// Register a logical commit or rollback.
    ///
    /// The counter is decremented before it is inspected, so repeated calls
    /// on a corrupt counter keep driving it further below zero.
    pub fn leave(&mut self) -> Result<Step, i64> {
        self.level -= 1;

        if self.level > 0 {
            return Ok(Step::Nested);
        }

        if self.level < 0 {
            return Err(self.level);
        }

        Ok(Step::Physical)
    }
}
