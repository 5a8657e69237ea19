//! eggOS Kernel: Binário Principal.
//!
//! Responsabilidade:
//! 1. Cabeçalho Multiboot v1 (o bootloader entra em 32 bits).
//! 2. Zerar BSS e montar a identidade de 1 GiB com páginas de 2 MiB.
//! 3. Ligar PAE + long mode e saltar para 64 bits.
//! 4. Chamar `kernel_main` com o runtime de demonstração como thread0.
//!
//! Fora do alvo bare-metal o binário é vazio.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod boot {
    use core::panic::PanicInfo;

    use eggos::syscall::numbers::{SYS_CLOCK_GETTIME, SYS_EXIT_GROUP, SYS_NANOSLEEP, SYS_WRITE};
    use eggos::syscall::raw;
    use eggos::{kernel_main, HostedRuntime};

    const MULTIBOOT_MAGIC: u32 = 0x1BAD_B002;
    // Alinhar módulos + pedir o mapa de memória
    const MULTIBOOT_FLAGS: u32 = 0x3;

    core::arch::global_asm!(
        r#"
    .pushsection .multiboot, "a"
    .balign 4
    .long {magic}
    .long {flags}
    .long -({magic} + {flags})
    .popsection

    .pushsection .text._start, "ax"
    .code32
    .global _start
_start:
    cli
    cld
    /* eax = magic, ebx = mbi; esi guarda o magic (rep stosb usa eax) */
    movl %eax, %esi

    movl $__bss_start, %edi
    movl $__bss_end, %ecx
    subl %edi, %ecx
    xorl %eax, %eax
    rep stosb

    movl $boot_stack_top, %esp

    /* PML4[0] -> PDPT, PDPT[0] -> PD */
    movl $boot_pdpt, %eax
    orl $0x3, %eax
    movl %eax, boot_pml4
    movl $boot_pd, %eax
    orl $0x3, %eax
    movl %eax, boot_pdpt

    /* PD: 512 páginas de 2 MiB, presentes e graváveis */
    xorl %ecx, %ecx
1:
    movl %ecx, %eax
    shll $21, %eax
    orl $0x83, %eax
    movl %eax, boot_pd(,%ecx,8)
    incl %ecx
    cmpl $512, %ecx
    jne 1b

    movl $boot_pml4, %eax
    movl %eax, %cr3

    /* CR4.PAE */
    movl %cr4, %eax
    orl $0x20, %eax
    movl %eax, %cr4

    /* EFER.LME (rdmsr/wrmsr usam edx:eax) */
    movl $0xC0000080, %ecx
    rdmsr
    orl $0x100, %eax
    wrmsr

    /* CR0.PG | CR0.PE */
    movl %cr0, %eax
    orl $0x80000001, %eax
    movl %eax, %cr0

    lgdt boot_gdt_ptr
    ljmp $0x08, $long_mode_start

    .code64
long_mode_start:
    movw $0x10, %ax
    movw %ax, %ds
    movw %ax, %es
    movw %ax, %ss
    xorw %ax, %ax
    movw %ax, %fs
    movw %ax, %gs

    movl %esi, %edi
    movl %ebx, %esi
    xorq %rbp, %rbp
    andq $-16, %rsp
    call boot_main
2:
    cli
    hlt
    jmp 2b
    .popsection

    .pushsection .rodata.boot_gdt, "a"
    .balign 16
boot_gdt:
    .quad 0
    .quad 0x00AF9A000000FFFF
    .quad 0x00CF92000000FFFF
boot_gdt_ptr:
    .word boot_gdt_ptr - boot_gdt - 1
    .quad boot_gdt
    .popsection

    .pushsection .bss.boot, "aw", @nobits
    .balign 4096
boot_pml4:
    .skip 4096
boot_pdpt:
    .skip 4096
boot_pd:
    .skip 4096
boot_stack:
    .skip 65536
boot_stack_top:
    .popsection

    .pushsection .text.demo_runtime, "ax"
    .global demo_runtime_start
demo_runtime_start:
    /* rsp aponta para argc */
    movq %rsp, %rdi
    andq $-16, %rsp
    call demo_runtime_main
    ud2
    .popsection
"#,
        magic = const MULTIBOOT_MAGIC,
        flags = const MULTIBOOT_FLAGS,
        options(att_syntax)
    );

    extern "C" {
        fn demo_runtime_start();
    }

    #[no_mangle]
    extern "C" fn boot_main(magic: u32, mbi: usize) -> ! {
        let runtime = HostedRuntime::new(demo_runtime_start as usize);
        kernel_main(magic, mbi, runtime)
    }

    fn write_out(s: &[u8]) {
        raw::syscall3(SYS_WRITE, 1, s.as_ptr() as usize, s.len());
    }

    /// Runtime de demonstração em Ring 3: cumprimenta, dorme algumas
    /// vezes e encerra.
    #[no_mangle]
    extern "C" fn demo_runtime_main(sp: *const usize) -> ! {
        // SAFETY: o kernel montou argc/argv/envp/auxv em `sp`
        let argc = unsafe { *sp };
        write_out(b"eggOS: runtime em ring 3\n");
        if argc > 0 {
            write_out(b"eggOS: argv recebido\n");
        }

        let second: [i64; 2] = [1, 0];
        let mut now: [i64; 2] = [0, 0];
        for _ in 0..3 {
            raw::syscall2(SYS_NANOSLEEP, second.as_ptr() as usize, 0);
            raw::syscall2(SYS_CLOCK_GETTIME, 1, now.as_mut_ptr() as usize);
            write_out(b"eggOS: tick\n");
        }
        raw::syscall1(SYS_EXIT_GROUP, 0);
        loop {
            core::hint::spin_loop();
        }
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        let msg = info.message().as_str().unwrap_or("(Panic) pânico do Rust");
        eggos::core::panic::throw(msg)
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
