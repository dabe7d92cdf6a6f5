pub mod clock;
pub mod context;
pub mod storage;
pub mod timers;

// Re-exports for convenience
pub use clock::{Clock, FrameClock, ManualClock, SystemClock, TickDelta};
pub use context::{ConfigError, SchedulerConfig, SchedulerConfigExt};
pub use hourglass_types::{INFINITE_LOOPS, TimerRecord, TimerSnapshot};
pub use storage::{FileStore, MemoryStore, SnapshotStore, StorageError};
pub use timers::{
    DeferredQueue, TickReport, Timer, TimerCallback, TimerError, TimerEvent, TimerRegistry,
};
