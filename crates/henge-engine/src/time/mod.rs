//! Time subsystem.
//!
//! Provides stable, testable frame timing utilities without coupling to the runtime.
//! Intended usage:
//! - one `FrameClock` per window
//! - call `tick()` once per presented frame to obtain `FrameTime`
//! - feed `FrameTime::dt` into animation helpers such as `PulseTimer`

mod frame_clock;
mod pulse;

pub use frame_clock::{FrameClock, FrameTime};
pub use pulse::PulseTimer;
