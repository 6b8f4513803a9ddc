pub mod browser_use;
pub mod config;
pub mod error;
pub mod intent;
pub mod models;
pub mod provider;
pub mod tavus;

pub use browser_use::BrowserUseClient;
pub use config::ConciergeConfig;
pub use error::ConciergeError;
pub use intent::{classify, Intent};
pub use models::{ActiveSession, Conversation, ConversationRequest, Session, Task};
pub use provider::{AutomationProvider, ConversationProvider};
pub use tavus::TavusClient;
