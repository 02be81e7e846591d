//! World save format and file helpers

pub mod disk_io;
pub mod snapshot;

pub use disk_io::{delete_world, load_world, save_world, world_exists, world_path};
pub use snapshot::{FORMAT_VERSION, MAGIC, WorldSnapshot};
