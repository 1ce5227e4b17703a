// Infrastructure: storage, id generation and viewer plumbing
pub mod id_generator;          // Snowflake-style ids
pub mod middleware;            // Viewer resolution at the HTTP edge
pub mod store;                 // Document store and decorators
pub mod viewer;                // Viewer context

pub use id_generator::IdGenerator;
pub use store::{SharedStore, SqliteStore, Store, TimeoutStore};
pub use viewer::ViewerContext;
