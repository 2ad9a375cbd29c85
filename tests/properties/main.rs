#[path = "../common/mod.rs"]
mod common;

mod invariant_tests;
