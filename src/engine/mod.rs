//! Backend engine: threshold tree, engine contexts and their construction

pub mod builder;
pub mod context;
pub mod threshold;

pub use builder::EngineEnvironment;
pub use context::{
    EngineContext, EngineMode, EngineState, EngineStats, DEFAULT_ASYNC_BUFFER,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use threshold::{parent_channel, ChannelBinding, Route, ThresholdTree};
