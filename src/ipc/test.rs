//! Testes de IPC executados no boot (feature `self_test`).
//!
//! Nenhum caminho aqui dorme: só consultas com timeout zero.

use super::epoll::{self, EpollEvent, EpollEvents, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_FD};
use super::futex::{futex, FUTEX_WAIT_PRIVATE, FUTEX_WAKE_PRIVATE};
use super::pipe;
use crate::kassert;
use crate::klib::test_framework::{run_test_suite, SuiteReport, TestCase, TestResult};
use crate::sys::Errno;

const TESTS: &[TestCase] = &[
    TestCase::new("ipc: futex com valor trocado", test_futex_eagain),
    TestCase::new("ipc: pipe acorda o epoll", test_pipe_epoll),
    TestCase::new("ipc: pipe sem leitor", test_pipe_epipe),
];

pub fn run() -> SuiteReport {
    run_test_suite("ipc", TESTS)
}

fn test_futex_eagain() -> TestResult {
    let word: u32 = 5;
    let addr = &word as *const u32 as usize;
    kassert!(futex(addr, FUTEX_WAIT_PRIVATE, 6, None) == Err(Errno::EAGAIN), "wait não viu a troca");
    kassert!(futex(addr, FUTEX_WAKE_PRIVATE, 1, None) == Ok(0), "wake acordou alguém");
    TestResult::Pass
}

fn test_pipe_epoll() -> TestResult {
    let Ok((r, w)) = pipe::pipe2() else {
        return TestResult::Fail;
    };
    let ev = EpollEvent::new(EpollEvents::IN, r as u64);
    kassert!(epoll::ctl(EPOLL_FD, EPOLL_CTL_ADD, r, Some(ev)).is_ok(), "epoll_ctl ADD");

    let mut out = [EpollEvent::default(); 2];
    kassert!(epoll::wait(EPOLL_FD, &mut out, 0) == Ok(0), "evento sem escrita");
    kassert!(pipe::write(w, b"egg") == Ok(3), "write curto");
    kassert!(epoll::wait(EPOLL_FD, &mut out, 0) == Ok(1), "escrita não notificou");
    kassert!({ out[0].data } == r as u64, "user data trocado");

    let _ = epoll::ctl(EPOLL_FD, EPOLL_CTL_DEL, r, None);
    let _ = pipe::close(r);
    let _ = pipe::close(w);
    TestResult::Pass
}

fn test_pipe_epipe() -> TestResult {
    let Ok((r, w)) = pipe::pipe2() else {
        return TestResult::Fail;
    };
    let mut buf = [0u8; 4];
    kassert!(pipe::read(r, &mut buf) == Err(Errno::EAGAIN), "pipe vazio sem EAGAIN");
    kassert!(pipe::close(r).is_ok(), "close leitura");
    kassert!(pipe::write(w, b"x") == Err(Errno::EPIPE), "escrita sem leitor");
    kassert!(pipe::close(w).is_ok(), "close escrita");
    TestResult::Pass
}
