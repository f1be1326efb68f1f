pub mod api;
pub mod events;
pub mod identity;
pub mod models;

/// Maximum post length, in characters, after trimming surrounding whitespace.
pub const MAX_POST_CHARS: usize = 140;
