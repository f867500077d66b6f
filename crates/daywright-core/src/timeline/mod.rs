//! Day timeline: busy time, free slots, and the busy map the allocator
//! builds from tasks, segments and fixed events.

mod busy;
mod gap;

pub use busy::BusyMap;
pub use gap::{find_free_slots, BusyInterval, FreeSlot, TimeGapDetector};
