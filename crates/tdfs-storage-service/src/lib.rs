//! The tdfs storage node: holds whole-file byte content on local disk and
//! answers create/read/grep requests from clients directed here by the
//! metadata service.

pub mod handler;
pub mod service;
pub mod store;

pub use handler::StorageServiceHandler;
pub use service::{StorageService, StorageServiceImpl};
pub use store::FileStore;
