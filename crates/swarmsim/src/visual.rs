//! Visualizer boundary.
//!
//! The orchestrator drives a visualizer through a narrow lifecycle trait so
//! that headless runs and interactive frontends share one code path. The
//! only signal flowing back is whether the operator closed the window,
//! which the runner treats as a stop request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

/// Lifecycle surface for a scenario visualizer.
pub trait Visualizer: Send {
    /// Brings the visualizer up for a starting scenario.
    fn start(&mut self);

    /// Stops rendering updates; the surface may stay visible.
    fn stop(&mut self);

    /// Tears the visualizer down entirely.
    fn destroy(&mut self);

    /// True once the operator has closed the visualizer.
    fn is_closed(&self) -> bool;
}

/// A no-op visualizer recording lifecycle transitions.
///
/// Used for headless runs and as a test double; `close_handle` lets a test
/// simulate the operator closing the window.
#[derive(Debug, Default)]
pub struct HeadlessVisualizer {
    started: bool,
    closed: Arc<AtomicBool>,
}

impl HeadlessVisualizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared flag that flips `is_closed` when set.
    pub fn close_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl Visualizer for HeadlessVisualizer {
    fn start(&mut self) {
        self.started = true;
        info!("headless visualizer started");
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn destroy(&mut self) {
        self.started = false;
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_handle_flips_is_closed() {
        let vis = HeadlessVisualizer::new();
        let handle = vis.close_handle();

        assert!(!vis.is_closed());
        handle.store(true, Ordering::SeqCst);
        assert!(vis.is_closed());
    }

    #[test]
    fn destroy_counts_as_closed() {
        let mut vis = HeadlessVisualizer::new();
        vis.start();
        vis.stop();
        vis.destroy();
        assert!(vis.is_closed());
    }
}
