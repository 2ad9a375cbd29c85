#[path = "../common/mod.rs"]
mod common;

mod budget_example_tests;
mod pipeline_tests;
mod ranking_tests;
