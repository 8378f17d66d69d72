use rand::Rng;

/// Random identifier for correlating a connection's logs before any player
/// id exists.
pub fn conn_id() -> u64 {
    rand::thread_rng().r#gen()
}

/// Random hex game id in the same 13-digit shape clients already expect.
pub fn new_game_id() -> String {
    let id: u64 = rand::thread_rng().r#gen();
    format!("{:x}", id & 0xf_ffff_ffff_ffff)
}
