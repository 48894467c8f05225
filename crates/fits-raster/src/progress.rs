//! Progress reporting with cooperative cancellation.

use std::ops::ControlFlow;

use crate::error::{CodecError, Result};

/// Receives `(completed, total)` scanline counts.
///
/// Returning [`ControlFlow::Break`] cancels the operation; it then fails
/// with [`CodecError::Cancelled`].
pub trait Progress {
    fn report(&mut self, completed: u64, total: u64) -> ControlFlow<()>;
}

impl<F> Progress for F
where
    F: FnMut(u64, u64) -> ControlFlow<()>,
{
    fn report(&mut self, completed: u64, total: u64) -> ControlFlow<()> {
        self(completed, total)
    }
}

/// Never reports and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _completed: u64, _total: u64) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

pub(crate) struct Tracker<'a, P: ?Sized> {
    progress: &'a mut P,
    completed: u64,
    total: u64,
}

impl<'a, P: Progress + ?Sized> Tracker<'a, P> {
    pub(crate) fn new(progress: &'a mut P, total: usize) -> Self {
        Tracker {
            progress,
            completed: 0,
            total: total as u64,
        }
    }

    pub(crate) fn start(&mut self) -> Result<()> {
        self.advance(0)
    }

    pub(crate) fn advance(&mut self, scanlines: usize) -> Result<()> {
        self.completed += scanlines as u64;
        match self.progress.report(self.completed, self.total) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => {
                tracing::debug!(completed = self.completed, total = self.total, "cancelled by progress hook");
                Err(CodecError::Cancelled)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn completed(&self) -> u64 {
        self.completed
    }
}
