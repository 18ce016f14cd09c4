/// Maximum number of texture loads in flight at once; further requests queue.
pub const MAX_CONCURRENT_TEXTURE_LOADS: usize = 2;

/// Root that relative texture urls are resolved against.
pub const TEXTURE_ROOT: &str = "textures";
