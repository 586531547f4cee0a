//! Game loop engine
//!
//! - `clock`: frame scheduling, delta clamping and FPS
//! - `input`: keyboard/pointer events to intents, listener guards
//! - `context`: what a host hands a game at creation
//! - `instance`: the start/stop/destroy runner shared by every game

pub mod clock;
pub mod context;
pub mod input;
pub mod instance;

pub use clock::{FpsCounter, FrameCallback, FrameClock, FrameHandle, FrameScheduler, ManualScheduler};
pub use context::{GameCallbacks, GameContext, GameOverPayload};
pub use input::{
    CountingInputSource, InputAdapter, InputFrame, InputSink, InputSource, Intent, ListenerGuard,
    NullInputSource, SLOT_COUNT,
};
pub use instance::{GameInstance, GameModule, RunPhase};
