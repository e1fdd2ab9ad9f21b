pub mod call;
pub mod channel;
pub mod dao;
pub mod media;
pub mod queue;

pub use call::{CallError, CallOrchestrator};
pub use channel::{ChannelEvent, ChannelPublisher};
pub use queue::{QueueError, QueueManager};
