use std::cell::RefCell;
use std::rc::Rc;

/// Receives layout progress. Percentages are in `0..=100`.
pub trait ProgressReporter {
    fn set_layout_completion(&mut self, percent: u8);

    fn start_layout(&mut self) {}

    fn done(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn set_layout_completion(&mut self, _percent: u8) {}
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for Rc<RefCell<P>> {
    fn set_layout_completion(&mut self, percent: u8) {
        self.borrow_mut().set_layout_completion(percent);
    }

    fn start_layout(&mut self) {
        self.borrow_mut().start_layout();
    }

    fn done(&mut self) {
        self.borrow_mut().done();
    }
}
