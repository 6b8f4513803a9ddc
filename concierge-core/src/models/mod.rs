pub mod conversation;
pub mod session;
pub mod task;

pub use conversation::{Conversation, ConversationRequest};
pub use session::{ActiveSession, Session, SessionList};
pub use task::Task;
