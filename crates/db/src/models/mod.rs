mod booth;
mod call;
mod queue_entry;
mod queue_message;
mod user;

pub use booth::Booth;
pub use call::{Call, CallInterpreter, CallState, InterpreterStatus};
pub use queue_entry::{QueueEntry, QueueEntryStatus};
pub use queue_message::{MessageSender, QueueMessage, QueueMessageKind};
pub use user::{User, UserRole};
