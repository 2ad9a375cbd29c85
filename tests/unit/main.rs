mod config_tests;
mod scorer_tests;
mod store_tests;
