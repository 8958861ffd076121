//! Domain operations on top of the store traits.
//!
//! Every function takes the store by reference plus the id of the acting
//! user; ownership checks happen here so the HTTP layer only maps errors.

pub mod activity;
pub mod chats;
pub mod notes;
pub mod profiles;
pub mod projects;

pub use activity::{RECENT_LIMIT, RecentActivity};
pub use chats::CHAT_TITLE_MAX_CHARS;
pub use notes::{DEFAULT_NOTE_TITLE, NewNote, NoteUpdate, Page};
pub use profiles::NewProfile;
pub use projects::{NewProject, ProjectUpdate};
