pub mod manager;
pub mod state;

pub use manager::TimerManager;
pub use state::{format_remaining, StepTimer, TimerStatus, TimerView};
