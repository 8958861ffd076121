pub mod chat;
pub mod message;
pub mod note;
pub mod profile;
pub mod project;

pub use chat::Chat;
pub use message::{ChatMessage, MessageRole, NewChatMessage, UpsertResult};
pub use note::{Note, NoteAction, NoteEventType};
pub use profile::UserProfile;
pub use project::Project;
