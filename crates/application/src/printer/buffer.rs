use domain::printer::{CutMode, PrintOperation};

/// Feed-then-cut appended to every submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub feed_lines: u8,
    pub cut: CutMode,
}

impl Default for Trailer {
    fn default() -> Self {
        Self {
            feed_lines: 3,
            cut: CutMode::Feed,
        }
    }
}

/// Operations accumulated for the next job of the active transaction
#[derive(Debug, Default)]
pub struct CommandBuffer {
    operations: Vec<PrintOperation>,
    trailer: Trailer,
}

impl CommandBuffer {
    pub fn new(trailer: Trailer) -> Self {
        Self {
            operations: Vec::new(),
            trailer,
        }
    }

    pub fn append(&mut self, operation: PrintOperation) {
        self.operations.push(operation);
    }

    pub fn operations(&self) -> &[PrintOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Take the buffered operations followed by exactly one feed and one cut.
    /// The buffer is empty afterwards.
    pub fn drain_for_submission(&mut self) -> Vec<PrintOperation> {
        let mut job = std::mem::take(&mut self.operations);
        job.push(PrintOperation::feed(self.trailer.feed_lines));
        job.push(PrintOperation::cut(self.trailer.cut));
        job
    }
}
