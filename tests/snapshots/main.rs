#[path = "../common/mod.rs"]
mod common;

mod pack_snapshots;
