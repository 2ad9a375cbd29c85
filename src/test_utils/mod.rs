//! Shared helpers for unit, integration and property tests.

pub mod fixtures;
pub mod logging;

pub use fixtures::{PatternBuilder, ranked, sample_corpus};
pub use logging::{LogCapture, LogEntry};

/// One row of a table-driven test.
#[derive(Debug, Clone)]
pub struct TestCase<I, E> {
    pub name: &'static str,
    pub input: I,
    pub expected: E,
}

impl<I, E> TestCase<I, E> {
    pub const fn new(name: &'static str, input: I, expected: E) -> Self {
        Self {
            name,
            input,
            expected,
        }
    }
}

/// Run every case and report all mismatches at once.
///
/// A panicking case is reported as a failure instead of aborting the table.
pub fn run_table_tests<I, E, F>(cases: Vec<TestCase<I, E>>, test_fn: F) -> Result<(), String>
where
    I: std::fmt::Debug + Clone + std::panic::RefUnwindSafe,
    E: std::fmt::Debug + PartialEq,
    F: Fn(I) -> E + std::panic::RefUnwindSafe,
{
    let mut failures = Vec::new();
    for case in cases {
        let started = std::time::Instant::now();
        let outcome = std::panic::catch_unwind(|| test_fn(case.input.clone()));
        let elapsed = started.elapsed();
        match outcome {
            Ok(actual) if actual == case.expected => {
                println!("[CASE] {} ok ({elapsed:?})", case.name);
            }
            Ok(actual) => failures.push(format!(
                "{}: input {:?}: expected {:?}, got {:?}",
                case.name, case.input, case.expected, actual
            )),
            Err(_) => failures.push(format!("{}: input {:?}: panicked", case.name, case.input)),
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures.join("\n"))
    }
}
