pub mod base;
pub mod booth;
pub mod call;
pub mod queue;
pub mod user;

pub use base::BaseDao;
pub use booth::BoothDao;
pub use call::CallDao;
pub use queue::QueueDao;
pub use user::UserDao;
