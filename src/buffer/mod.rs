mod frame;
mod frame_allocator;
mod frame_cache;
mod frame_manager;

pub use frame::*;
pub use frame_allocator::*;
pub use frame_cache::*;
pub use frame_manager::*;
