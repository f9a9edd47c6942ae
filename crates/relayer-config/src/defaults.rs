/// Pipeline queues hold `16` items by default.
pub const fn channel_capacity() -> usize {
    16
}
/// The listener scans `128` blocks below the latest verified block.
pub const fn gap_fill_depth() -> u32 {
    128
}
/// The commitment writer pauses `2` seconds after every transaction.
pub const fn rate_limit() -> u64 {
    2
}
/// The store is polled every `6` seconds.
pub const fn poll_interval() -> u64 {
    6
}
