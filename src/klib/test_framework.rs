//! Framework de testes do kernel
//!
//! As suites de `*/test.rs` rodam no boot (feature `self_test`), antes do
//! escalonador, e as mesmas tabelas de casos rodam como testes de host.

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Pass,
    Fail,
    Skip,
}

/// Um caso de teste
pub struct TestCase {
    pub name: &'static str,
    pub func: fn() -> TestResult,
}

impl TestCase {
    pub const fn new(name: &'static str, func: fn() -> TestResult) -> Self {
        Self { name, func }
    }
}

/// Contadores de uma suite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteReport {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Executa suite de testes
pub fn run_test_suite(name: &str, tests: &[TestCase]) -> SuiteReport {
    crate::klog!("=== Suite: ");
    crate::klog!(name);
    crate::knl!();

    let mut report = SuiteReport::default();

    for test in tests {
        match (test.func)() {
            TestResult::Pass => {
                crate::kok!(test.name);
                report.passed += 1;
            }
            TestResult::Fail => {
                crate::kfail!(test.name);
                report.failed += 1;
            }
            TestResult::Skip => {
                crate::kwarn!(test.name);
                report.skipped += 1;
            }
        }
    }

    crate::kinfo!("Resultados: passed=", report.passed);
    if report.failed > 0 {
        crate::kerror!("Resultados: failed=", report.failed);
    }
    report
}

/// `Fail` com log quando a condição é falsa.
#[macro_export]
macro_rules! kassert {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            $crate::kerror!($msg);
            return $crate::klib::test_framework::TestResult::Fail;
        }
    };
}
