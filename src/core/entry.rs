//! Entry Point Lógico do Kernel.
//!
//! `kernel_main` é o primeiro código Rust de alto nível a rodar depois do
//! trampolim de 32 bits do binário. Inicializa os subsistemas na ordem
//! estrita de dependência e entrega a CPU ao escalonador.
//!
//! O runtime hospedado roda em thread0. Até
//! `post_init` todas as syscalls dele são atendidas no próprio trap.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::core::boot::multiboot::{BootInfo, BOOT_INFO};
use crate::trap::RuntimeHooks;

/// O que o kernel precisa saber do runtime que embarca.
#[derive(Clone, Copy)]
pub struct HostedRuntime {
    /// Ponto de entrada do runtime (Ring 3, thread0)
    pub entry: usize,
    /// Ganchos de pânico e de syscall bloqueante
    pub hooks: Option<RuntimeHooks>,
}

impl HostedRuntime {
    pub const fn new(entry: usize) -> Self {
        Self { entry, hooks: None }
    }

    pub const fn with_hooks(mut self, hooks: RuntimeHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

static BOOTSTRAP_DONE: AtomicBool = AtomicBool::new(false);

/// O serviço de syscalls já está de pé?
#[inline]
pub fn bootstrap_done() -> bool {
    BOOTSTRAP_DONE.load(Ordering::Acquire)
}

/// Chamado pelo serviço de syscalls antes do primeiro `wait_syscall`:
/// ancora o relógio de parede e libera o encaminhamento.
pub fn post_init() {
    crate::core::time::clock::init_base();
    BOOTSTRAP_DONE.store(true, Ordering::Release);
    crate::kok!("(Boot) Bootstrap concluído");
}

/// Função principal do Kernel (High-Level).
///
/// Chamada pelo `_start` com `magic`/`mbi` do bootloader, interrupções
/// desabilitadas e a identidade de 1 GiB montada.
pub fn kernel_main(magic: u32, mbi: usize, runtime: HostedRuntime) -> ! {
    // 1. Serial primeiro: daqui em diante kinfo!/kerror! funcionam
    crate::drivers::serial::init();
    crate::kinfo!("eggOS - Iniciando");

    // 2. FPU, GDT/TSS e IDT
    // SAFETY: início do boot, interrupções desabilitadas
    unsafe { crate::arch::platform::init_basics() };

    // 3. Informação do bootloader
    // SAFETY: `mbi` veio do bootloader e está dentro da identidade
    let boot = match unsafe { BootInfo::from_raw(magic, mbi) } {
        Ok(info) => Some(BOOT_INFO.call_once(|| info)),
        Err(_) => {
            crate::kwarn!("(Boot) Multiboot inválido, magic=", magic);
            None
        }
    };

    // 4. Traps e memória
    crate::trap::init();
    if let Some(hooks) = runtime.hooks {
        crate::trap::hooks::install(hooks);
    }
    crate::mm::init(boot);
    crate::mm::heap::init();

    // 5. thread0 carrega o runtime
    // SAFETY: a cmdline fica na identidade mapeada acima
    let cmdline = boot.and_then(|b| unsafe { b.cmdline() }).unwrap_or(&[]);
    crate::sched::init_thread0(runtime.entry, cmdline);

    // 6. Syscalls e IPC
    crate::syscall::init();
    crate::ipc::init();

    // 7. PIC e PIT
    crate::drivers::pic::init();
    crate::core::time::init();

    // 8. Autotestes
    #[cfg(feature = "self_test")]
    run_self_tests();

    // 9. Threads de kernel e o loop do escalonador
    crate::sched::init();
    crate::trap::irq::spawn_service();
    crate::syscall::service::spawn_service();

    crate::kinfo!("(Boot) Entregando a CPU ao escalonador");
    crate::sched::schedule()
}

#[cfg(feature = "self_test")]
fn run_self_tests() {
    use crate::klib::test_framework::SuiteReport;

    let suites: [fn() -> SuiteReport; 5] = [
        crate::mm::test::run,
        crate::sched::test::run,
        crate::syscall::test::run,
        crate::ipc::test::run,
        crate::core::test::run,
    ];
    let failed: usize = suites.iter().map(|run| run().failed).sum();
    if failed > 0 {
        crate::core::panic::throw("(Boot) autotestes falharam");
    }
    crate::kok!("(Boot) Autotestes OK");
}
