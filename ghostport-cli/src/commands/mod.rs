//! CLI command implementations.

pub mod export;
pub mod init;
pub mod verify;

pub use export::export_backup;
pub use init::init_project;
pub use verify::verify_output;
