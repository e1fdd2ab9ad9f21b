pub mod booth;
pub mod call;
pub mod media;
pub mod queue;
