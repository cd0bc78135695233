pub mod store;

pub use store::{LoginRequest, SessionRecord, SessionStore};
