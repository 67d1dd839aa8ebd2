pub mod clock;
pub mod engine;
pub mod state;

pub use clock::{Clock, ClockSubscription, TokioClock, TICK_MS};
pub use engine::TimerEngine;
pub use state::{CyclePhase, Effect, ModeSwitchPolicy, TimerMode, TimerState};
