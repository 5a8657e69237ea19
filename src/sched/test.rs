//! Testes do escalonador executados no boot (feature `self_test`).
//!
//! Rodam antes de `schedule()`, sobre tabelas locais: a tabela global
//! ainda não tem thread corrente.

use alloc::boxed::Box;

use super::task::lifecycle::{clone_in, spawn_kernel_in};
use super::task::{ThreadState, ThreadTable};
use crate::kassert;
use crate::klib::test_framework::{run_test_suite, SuiteReport, TestCase, TestResult};

const TESTS: &[TestCase] = &[
    TestCase::new("sched: wakeup acorda min(n, N)", test_wakeup_min),
    TestCase::new("sched: pickup prioriza serviços", test_pickup_services),
    TestCase::new("sched: clone isola kstack e FPU", test_clone_isolation),
];

pub fn run() -> SuiteReport {
    run_test_suite("sched", TESTS)
}

extern "C" fn nop(_: usize) {}

fn test_wakeup_min() -> TestResult {
    let mut table = Box::new(ThreadTable::new());
    for _ in 0..5 {
        let id = spawn_kernel_in(&mut table, nop, 0);
        table.sleep(id, 0xABC);
    }
    kassert!(table.wakeup(0xABC, 2) == 2, "wakeup(2) acordou errado");
    kassert!(table.wakeup(0xABC, -1) == 3, "wakeup(-1) não acordou o resto");
    TestResult::Pass
}

fn test_pickup_services() -> TestResult {
    let mut table = Box::new(ThreadTable::new());
    let a = spawn_kernel_in(&mut table, nop, 0);
    let svc = spawn_kernel_in(&mut table, nop, 0);
    table.syscall_task = Some(svc);
    kassert!(table.pickup() == svc, "serviço de syscall não priorizado");
    table.sleep(svc, 1);
    kassert!(table.pickup() == a, "round-robin não escolheu a thread comum");
    TestResult::Pass
}

fn test_clone_isolation() -> TestResult {
    let mut table = Box::new(ThreadTable::new());
    let parent = spawn_kernel_in(&mut table, nop, 0);
    let c1 = clone_in(&mut table, parent, 0, 0x1000, 0);
    let c2 = clone_in(&mut table, parent, 0, 0x2000, 0);
    let (t1, t2) = (table.get(c1), table.get(c2));
    kassert!(t1.kstack != t2.kstack, "kstacks compartilhadas");
    kassert!(t1.fpstate != t2.fpstate, "áreas de FPU compartilhadas");
    kassert!(t1.state == ThreadState::Runnable, "filho não executável");
    let (f1, f2) = unsafe { (*(t1.tf as *const crate::arch::TrapFrame), *(t2.tf as *const crate::arch::TrapFrame)) };
    kassert!(f1.rip == f2.rip && f1.rax == 0 && f2.rsp == 0x2000, "frames divergentes");
    TestResult::Pass
}
