//! Testes do Core executados no boot (feature `self_test`).
//!
//! Handoff do bootloader, pilha inicial do runtime e aritmética do relógio.

use crate::core::boot::cmdline::{prepare_args, split_args};
use crate::core::boot::multiboot::{BootError, BootInfo};
use crate::core::time::clock::{wallclock_at, SECOND, TICK_NS};
use crate::drivers::cmos::days_from_civil;
use crate::kassert;
use crate::klib::test_framework::{run_test_suite, SuiteReport, TestCase, TestResult};

const TESTS: &[TestCase] = &[
    TestCase::new("core: magic multiboot inválido", test_bad_magic),
    TestCase::new("core: argv a partir da cmdline", test_args),
    TestCase::new("core: relógio de parede", test_wallclock),
    TestCase::new("core: calendário civil", test_civil),
];

pub fn run() -> SuiteReport {
    run_test_suite("core", TESTS)
}

fn test_bad_magic() -> TestResult {
    // SAFETY: com magic errado a estrutura nunca é lida
    let r = unsafe { BootInfo::from_raw(0xDEAD_BEEF, 0x1000) };
    kassert!(matches!(r, Err(BootError::BadMagic(0xDEAD_BEEF))), "magic errado aceito");
    TestResult::Pass
}

#[repr(align(16))]
struct Area([u8; 512]);

fn test_args() -> TestResult {
    let cmdline = b"egg  -v  run";
    kassert!(split_args(cmdline).count() == 3, "split contou errado");

    let mut area = Area([0; 512]);
    let Ok(used) = prepare_args(&mut area.0, cmdline, 4096) else {
        return TestResult::Fail;
    };
    kassert!(used > 0 && used <= area.0.len(), "tamanho usado inválido");
    let argc = area.0[..8].try_into().map_or(0, usize::from_ne_bytes);
    kassert!(argc == 3, "argc errado");

    let mut tiny = [0u8; 16];
    kassert!(prepare_args(&mut tiny, cmdline, 4096).is_err(), "área pequena aceita");
    TestResult::Pass
}

fn test_wallclock() -> TestResult {
    let ts = wallclock_at(150, 50, 1_000, 0);
    kassert!(ts.tv_sec == 1_001, "segundos errados");
    kassert!(ts.tv_nsec == 0, "nanossegundos errados");
    let ts = wallclock_at(51, 50, 0, 0);
    kassert!(ts.tv_nsec == TICK_NS && ts.tv_nsec < SECOND, "fração de tick errada");
    TestResult::Pass
}

fn test_civil() -> TestResult {
    kassert!(days_from_civil(1970, 1, 1) == 0, "época deslocada");
    kassert!(days_from_civil(2000, 3, 1) == 11_017, "2000-03-01 errado");
    TestResult::Pass
}
