//! Mutation pipelines over the record store.

mod files;
mod messages;

pub use files::FileService;
pub use messages::MessageService;
