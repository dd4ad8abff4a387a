pub mod blob_store;
pub mod config_io;
pub mod lock;
pub mod recovery;
pub mod snapshot;
pub mod state;
