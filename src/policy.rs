//! When and how the entries get written to disk.

/// Controls when the store dumps itself.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DumpPolicy {
    /// Only write when `dump()` is called (or a scope/crash boundary does it).
    #[default]
    Manual,
    /// Dump after every successful mutation. Safest, but every write costs a
    /// full rewrite of the file.
    Immediate,
}

/// How a dump replaces the previous file contents.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate the file and write in place. A crash mid-write can leave a
    /// truncated file behind.
    #[default]
    Overwrite,
    /// Write a sibling temp file, then rename it over the target.
    AtomicRename,
}
