mod manager;
mod serializer;

pub use manager::{BoothQueueItem, QueueError, QueueManager, QueueStatus};
pub use serializer::KeyedSerializer;
