//! Safety mechanisms.
//!
//! - Kill switch: manual, global emergency stop checked before every
//!   execution attempt

mod kill_switch;

pub use kill_switch::{KillSwitch, KillSwitchStatus};
