//! Temporal gesture logic: debounce, zone residency and motion patterns

pub mod debounce;
pub mod motion;
pub mod zone;

pub use debounce::{ChannelEvent, ChannelRole, ChannelState, ChannelStatus, DebounceChannel};
pub use motion::{MotionPattern, MotionStats, MotionTracker};
pub use zone::{HoldState, Zone, ZoneTracker, ZoneUpdate};
