use std::env;

// Runtime/server constants (not gameplay rules).

pub fn http_port() -> u16 {
    env::var("SNAKE_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// Ticks per second for every session's fixed-step loop.
pub fn tick_rate() -> u32 {
    env::var("SNAKE_TICK_RATE")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|rate| *rate > 0)
        .unwrap_or(10)
}

/// Side length of the square board.
pub fn grid_size() -> i32 {
    env::var("SNAKE_GRID_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|size| *size >= 2)
        .unwrap_or(20)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const SNAPSHOT_BROADCAST_CAPACITY: usize = 128;
