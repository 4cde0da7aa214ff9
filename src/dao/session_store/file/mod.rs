mod error;
mod layout;
mod store;

pub use error::{FileDaoError, FileResult};
pub use store::FileSessionStore;
