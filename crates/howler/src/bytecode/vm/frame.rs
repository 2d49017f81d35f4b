//! Call frames.

use std::rc::Rc;

use crate::bytecode::code::{Closure, Instructions};

/// Per-call execution record: the closure being run, an instruction pointer,
/// and where on the value stack this call's locals start.
#[derive(Debug)]
pub struct Frame {
    pub closure: Rc<Closure>,
    /// Index of the last executed byte; starts at -1 so the first step of
    /// the run loop lands on offset 0.
    pub ip: isize,
    /// Stack slot where locals begin. Parameters occupy the first
    /// `num_parameters` of them.
    pub base_pointer: usize,
}

impl Frame {
    #[must_use]
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: -1,
            base_pointer,
        }
    }

    #[must_use]
    pub fn instructions(&self) -> &Instructions {
        &self.closure.function.instructions
    }
}
