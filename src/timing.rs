//! Build timing utilities.

use std::time::Instant;

use crate::report::Reporter;

/// Measures one build phase.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    /// Report the elapsed time through `reporter`.
    pub fn finish(self, reporter: &Reporter) {
        let secs = self.start.elapsed().as_secs_f64();
        if secs >= 60.0 {
            reporter.status(format!("[{:.1}m] {}", secs / 60.0, self.name));
        } else {
            reporter.status(format!("[{:.1}s] {}", secs, self.name));
        }
    }
}
