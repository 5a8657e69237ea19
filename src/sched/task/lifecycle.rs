//! Task Lifecycle
//!
//! Criação de threads (thread 0 do runtime, threads de kernel, `clone`) e
//! término. Toda thread nova nasce com um `TrapFrame` no topo da sua kstack
//! e um contexto que entra por `__trapret`: a primeira execução é um
//! `iretq` para o frame montado aqui.
//!
//! As variantes `*_in` operam sobre uma tabela explícita; as globais
//! (em `sched::core::scheduler`) apenas tomam o lock de `THREADS`.

use core::mem::size_of;

use super::state::ThreadState;
use super::table::ThreadTable;
use super::thread::{Thread, ThreadId};
use crate::arch::TrapFrame;
use crate::core::boot::cmdline::{self, ARGS_AREA_SIZE};
use crate::core::panic::throw;
use crate::mm::{self, PAGE_SIZE};
use crate::sched::config::{FPU_STATE_SIZE, THREAD_STACK_GUARD_OFFSET, THREAD_STACK_SIZE};
use crate::sched::context::CpuContext;

/// Entrada de uma thread de kernel: recebe o argumento em RDI.
pub type KernelEntry = extern "C" fn(usize);

/// `clone(2)`: define o TLS do filho.
pub const CLONE_SETTLS: usize = 0x0008_0000;

/// Mapeia uma pilha nova e devolve o topo utilizável.
pub fn alloc_stack() -> usize {
    let base = mm::mmap(0, THREAD_STACK_SIZE);
    base + THREAD_STACK_SIZE - THREAD_STACK_GUARD_OFFSET
}

/// Garante kstack e área de FPU no slot (reaproveitadas na reciclagem).
fn prepare(t: &mut Thread) {
    if t.kstack == 0 {
        t.kstack = alloc_stack();
    }
    if t.fpstate == 0 {
        t.fpstate = mm::alloc();
    }
}

/// Endereço onde o frame inicial fica: o topo da kstack.
#[inline]
pub fn frame_slot(kstack: usize) -> usize {
    kstack - size_of::<TrapFrame>()
}

/// Grava `tf` no topo da kstack e aponta o contexto para `__trapret`.
fn install_frame(t: &mut Thread, tf: &TrapFrame) {
    let addr = frame_slot(t.kstack);
    // SAFETY: a kstack é do slot e tem espaço para o frame
    unsafe { (addr as *mut TrapFrame).write(*tf) };
    t.tf = addr;
    t.context = CpuContext::for_trapret(addr);
}

/// Estado inicial de FPU: uma imagem do estado corrente.
#[cfg(not(test))]
fn init_fpu(area: usize) {
    // SAFETY: a área é uma página alinhada do slot
    unsafe { crate::arch::Cpu::fxsave(area) };
}

#[cfg(test)]
fn init_fpu(area: usize) {
    let _ = area;
}

/// Cria a thread 0: o runtime hospedado, em Ring 3, com a pilha inicial
/// no formato do Linux montada a partir de `cmdline`.
pub fn init_thread0_in(table: &mut ThreadTable, entry: usize, cmdline: &[u8]) -> ThreadId {
    let id = table.alloc();
    let t = table.get_mut(id);
    prepare(t);

    t.stack = alloc_stack();
    let area_base = t.stack - ARGS_AREA_SIZE;
    // SAFETY: a região está dentro da pilha recém-mapeada
    let area = unsafe { core::slice::from_raw_parts_mut(area_base as *mut u8, ARGS_AREA_SIZE) };
    if cmdline::prepare_args(area, cmdline, PAGE_SIZE).is_err() {
        throw("(Sched) argumentos não cabem na pilha inicial");
    }

    install_frame(t, &TrapFrame::for_user(entry, area_base));
    init_fpu(t.fpstate);
    t.state = ThreadState::Runnable;
    crate::kinfo!("(Sched) Thread 0 pronta, entry=", entry);
    id
}

/// Cria uma thread de kernel que executa `entry(arg)` em Ring 0.
///
/// Ela roda na própria kstack; ao retornar de `entry` cai em
/// `kthread_exit`.
pub fn spawn_kernel_in(table: &mut ThreadTable, entry: KernelEntry, arg: usize) -> ThreadId {
    match try_spawn_kernel_in(table, entry, arg) {
        Some(id) => id,
        None => throw("no thread slot available"),
    }
}

/// `spawn_kernel_in` que devolve `None` com a tabela cheia.
pub fn try_spawn_kernel_in(table: &mut ThreadTable, entry: KernelEntry, arg: usize) -> Option<ThreadId> {
    let id = table.try_alloc()?;
    let t = table.get_mut(id);
    prepare(t);

    // A pilha da thread começa logo abaixo do frame inicial
    let sp = frame_slot(t.kstack);
    install_frame(t, &TrapFrame::for_kernel_thread(entry as usize, arg, sp));
    init_fpu(t.fpstate);
    t.state = ThreadState::Runnable;
    Some(id)
}

/// `clone(2)` de threads: o filho retoma do mesmo ponto que o pai, com
/// `rax = 0`, na pilha `usp` (se dada) e com o TLS de `tls` quando
/// `CLONE_SETTLS` está em `flags`.
pub fn clone_in(table: &mut ThreadTable, parent: ThreadId, flags: usize, usp: usize, tls: usize) -> ThreadId {
    let (ptf, pfp, pfs, pmask) = {
        let p = table.get(parent);
        let Some(ptf) = p.frame() else {
            throw("(Sched) clone sem frame do pai");
        };
        // SAFETY: o frame do pai vive na pilha dele enquanto ele está no trap
        (unsafe { *ptf }, p.fpstate, p.fs_base, p.signal.mask)
    };
    let parent_is_current = table.current() == Some(parent);

    let id = table.alloc();
    let t = table.get_mut(id);
    prepare(t);

    let mut tf = ptf;
    if usp != 0 {
        tf.rsp = usp;
    }
    tf.rax = 0;
    install_frame(t, &tf);

    if parent_is_current {
        // O estado vivo da FPU é o do pai
        init_fpu(t.fpstate);
    } else {
        // SAFETY: ambas as áreas têm FPU_STATE_SIZE bytes
        unsafe { core::ptr::copy_nonoverlapping(pfp as *const u8, t.fpstate as *mut u8, FPU_STATE_SIZE) };
    }

    t.fs_base = if flags & CLONE_SETTLS != 0 { tls } else { pfs };
    t.signal.mask = pmask;
    t.state = ThreadState::Runnable;
    id
}

/// Marca a thread como terminada. O slot é reciclado pelo próximo `alloc`.
pub fn exit_in(table: &mut ThreadTable, id: ThreadId) {
    let t = table.get_mut(id);
    t.state = ThreadState::Exit;
    t.tf = 0;
}

/// Fim comum das threads de kernel (chamado por `__kthread_entry`).
pub extern "C" fn kthread_exit() -> ! {
    crate::sched::exit_current()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::platform::gdt::{KERNEL_CODE_SEL, USER_CODE_SEL};
    use crate::arch::platform::interrupts::{kthread_entry_addr, trapret_addr};
    use alloc::boxed::Box;

    extern "C" fn nop(_: usize) {}

    fn frame_of(table: &ThreadTable, id: ThreadId) -> TrapFrame {
        let tf = table.get(id).frame().unwrap();
        unsafe { *tf }
    }

    #[test]
    fn kernel_thread_starts_at_kthread_entry() {
        let mut table = Box::new(ThreadTable::new());
        let id = spawn_kernel_in(&mut table, nop, 0x77);
        let t = table.get(id);
        let tf = frame_of(&table, id);

        assert_eq!(t.state, ThreadState::Runnable);
        assert_eq!(t.tf, frame_slot(t.kstack));
        assert_eq!(t.context.rsp, t.tf);
        assert_eq!(t.context.rip, trapret_addr());
        assert_eq!(tf.rip, kthread_entry_addr());
        assert_eq!((tf.rdi, tf.rsi), (nop as usize, 0x77));
        assert_eq!(tf.cs, KERNEL_CODE_SEL.bits());
        assert!(tf.interrupts_enabled());
        assert_eq!(tf.rsp, t.tf);
    }

    #[test]
    fn thread0_gets_linux_initial_stack() {
        let mut table = Box::new(ThreadTable::new());
        let id = init_thread0_in(&mut table, 0x40_1000, b"prog -v");
        let tf = frame_of(&table, id);

        assert_eq!(tf.cs, USER_CODE_SEL.bits());
        assert_eq!(tf.rip, 0x40_1000);
        assert_eq!(tf.rsp % 16, 0);
        let argc = unsafe { *(tf.rsp as *const usize) };
        assert_eq!(argc, 2);
    }

    #[test]
    fn clone_copies_parent_frame() {
        let mut table = Box::new(ThreadTable::new());
        let parent = init_thread0_in(&mut table, 0x40_1000, b"");
        {
            let p = table.get_mut(parent);
            let tf = unsafe { &mut *p.frame().unwrap() };
            tf.rip = 0x40_2222;
            tf.rax = 56;
            tf.rbx = 0xBEEF;
            p.fs_base = 0x7000;
            unsafe { *(p.fpstate as *mut u8) = 0x5A };
        }

        let child = clone_in(&mut table, parent, CLONE_SETTLS, 0x9_0000, 0x8000);
        let tf = frame_of(&table, child);
        let c = table.get(child);

        assert_ne!(child, parent);
        assert_eq!((tf.rip, tf.rax, tf.rbx, tf.rsp), (0x40_2222, 0, 0xBEEF, 0x9_0000));
        assert_eq!(c.fs_base, 0x8000);
        assert_eq!(unsafe { *(c.fpstate as *const u8) }, 0x5A);
        assert_eq!(c.state, ThreadState::Runnable);
    }

    #[test]
    fn clone_without_settls_inherits_tls() {
        let mut table = Box::new(ThreadTable::new());
        let parent = init_thread0_in(&mut table, 0x40_1000, b"");
        table.get_mut(parent).fs_base = 0x7000;
        let parent_rsp = frame_of(&table, parent).rsp;

        let child = clone_in(&mut table, parent, 0, 0, 0x8000);
        assert_eq!(table.get(child).fs_base, 0x7000);
        assert_eq!(frame_of(&table, child).rsp, parent_rsp);
    }

    #[test]
    fn exited_slot_reuses_kernel_stack() {
        let mut table = Box::new(ThreadTable::new());
        let a = spawn_kernel_in(&mut table, nop, 0);
        let kstack = table.get(a).kstack;
        exit_in(&mut table, a);

        let b = spawn_kernel_in(&mut table, nop, 1);
        assert_eq!(a, b);
        assert_eq!(table.get(b).kstack, kstack);
    }
}
