//! Spinner animation frames

use std::time::Duration;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Frame to show after `elapsed` time
pub fn frame_at(elapsed: Duration) -> &'static str {
    let index = (elapsed.as_millis() / FRAME_DURATION.as_millis()) as usize;
    SPINNER_FRAMES[index % SPINNER_FRAMES.len()]
}
