/// Arquivo: x86_64/gdt.rs
///
/// Propósito: Global Descriptor Table (GDT) e Task State Segment (TSS).
/// A GDT define os segmentos de Kernel (Ring 0) e do runtime hospedado
/// (Ring 3). O TSS fornece o RSP0 usado quando um trap chega em Ring 3.
///
/// Detalhes de Implementação:
/// - Seletores fixos: os stubs de trap e a criação de threads dependem deles.
/// - `set_kernel_stack` é chamado a cada troca de thread.
use core::mem::size_of;

/// Seletor de segmento
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SegmentSelector(pub u16);

impl SegmentSelector {
    pub const fn new(index: u16, rpl: u8) -> Self {
        Self((index << 3) | (rpl as u16))
    }

    pub const fn bits(self) -> usize {
        self.0 as usize
    }
}

// Index 0: Null
// Index 1: Kernel Code
// Index 2: Kernel Data
// Index 3: User Data
// Index 4: User Code
// Index 5: TSS (ocupa 2 slots em 64-bit)
pub const KERNEL_CODE_SEL: SegmentSelector = SegmentSelector::new(1, 0);
pub const KERNEL_DATA_SEL: SegmentSelector = SegmentSelector::new(2, 0);
pub const USER_DATA_SEL: SegmentSelector = SegmentSelector::new(3, 3);
pub const USER_CODE_SEL: SegmentSelector = SegmentSelector::new(4, 3);
pub const TSS_SEL: SegmentSelector = SegmentSelector::new(5, 0);

/// Entrada da GDT (64-bit)
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct GdtEntry {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    flags_limit_high: u8,
    base_high: u8,
}

impl GdtEntry {
    const fn segment(access: u8, flags: u8) -> Self {
        Self {
            limit_low: 0xFFFF,
            base_low: 0,
            base_mid: 0,
            access,
            flags_limit_high: flags,
            base_high: 0,
        }
    }

    pub const fn null() -> Self {
        Self {
            limit_low: 0,
            base_low: 0,
            base_mid: 0,
            access: 0,
            flags_limit_high: 0,
            base_high: 0,
        }
    }

    /// Present, Ring 0, Code, Readable, Long mode
    pub const fn kernel_code() -> Self {
        Self::segment(0x9A, 0xAF)
    }

    /// Present, Ring 0, Data, Writable
    pub const fn kernel_data() -> Self {
        Self::segment(0x92, 0xCF)
    }

    /// Present, Ring 3, Code, Readable, Long mode
    pub const fn user_code() -> Self {
        Self::segment(0xFA, 0xAF)
    }

    /// Present, Ring 3, Data, Writable
    pub const fn user_data() -> Self {
        Self::segment(0xF2, 0xCF)
    }

    /// Parte BAIXA do descritor de TSS (16 bytes em 64-bit).
    pub fn tss_low(base: u64, limit: u32) -> Self {
        Self {
            limit_low: (limit & 0xFFFF) as u16,
            base_low: (base & 0xFFFF) as u16,
            base_mid: ((base >> 16) & 0xFF) as u8,
            access: 0x89, // Present, Ring 0, Available TSS
            flags_limit_high: ((limit >> 16) & 0xF) as u8,
            base_high: ((base >> 24) & 0xFF) as u8,
        }
    }

    /// Parte ALTA do descritor de TSS.
    pub fn tss_high(base: u64) -> Self {
        Self {
            limit_low: ((base >> 32) & 0xFFFF) as u16,
            base_low: ((base >> 48) & 0xFFFF) as u16,
            base_mid: 0,
            access: 0,
            flags_limit_high: 0,
            base_high: 0,
        }
    }
}

/// Task State Segment (TSS)
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct Tss {
    reserved0: u32,
    pub rsp0: u64,
    pub rsp1: u64,
    pub rsp2: u64,
    reserved1: u64,
    pub ist: [u64; 7],
    reserved2: u64,
    reserved3: u16,
    pub iomap_base: u16,
}

impl Tss {
    pub const fn new() -> Self {
        Self {
            reserved0: 0,
            rsp0: 0,
            rsp1: 0,
            rsp2: 0,
            reserved1: 0,
            ist: [0; 7],
            reserved2: 0,
            reserved3: 0,
            iomap_base: size_of::<Tss>() as u16,
        }
    }
}

const _: () = assert!(size_of::<Tss>() == 104);
const _: () = assert!(size_of::<GdtEntry>() == 8);

static mut GDT: [GdtEntry; 7] = [
    GdtEntry::null(),
    GdtEntry::kernel_code(),
    GdtEntry::kernel_data(),
    GdtEntry::user_data(),
    GdtEntry::user_code(),
    GdtEntry::null(), // TSS low (preenchido no init)
    GdtEntry::null(), // TSS high
];

static mut TSS: Tss = Tss::new();

/// Ponteiro da GDT (GDTR)
#[repr(C, packed)]
struct GdtDescriptor {
    limit: u16,
    base: u64,
}

/// Carrega a GDT definitiva e o TSS.
///
/// # Safety
///
/// Deve ser chamado apenas uma vez durante o boot.
/// Recarrega CS, DS, ES, SS e TR.
pub unsafe fn init() {
    let tss_base = (&raw const TSS) as u64;
    let tss_limit = (size_of::<Tss>() - 1) as u32;

    GDT[5] = GdtEntry::tss_low(tss_base, tss_limit);
    GDT[6] = GdtEntry::tss_high(tss_base);

    let gdtr = GdtDescriptor {
        limit: (size_of::<[GdtEntry; 7]>() - 1) as u16,
        base: (&raw const GDT) as u64,
    };

    core::arch::asm!("lgdt [{}]", in(reg) &gdtr, options(readonly, nostack, preserves_flags));

    // CS só pode ser recarregado com um far return
    core::arch::asm!(
        "push {kcode}",
        "lea {tmp}, [rip + 2f]",
        "push {tmp}",
        "retfq",
        "2:",
        "mov ds, {kdata:e}",
        "mov es, {kdata:e}",
        "mov ss, {kdata:e}",
        "xor {tmp:e}, {tmp:e}",
        "mov fs, {tmp:e}",
        "mov gs, {tmp:e}",
        "ltr {tss:x}",
        kcode = in(reg) KERNEL_CODE_SEL.0 as u64,
        tmp = out(reg) _,
        kdata = in(reg) KERNEL_DATA_SEL.0 as u64,
        tss = in(reg) TSS_SEL.0 as u64,
    );

    crate::ktrace!("(Arch) GDT carregada, TR=", TSS_SEL.0);
}

/// Define o stack pointer do kernel (RSP0) no TSS.
///
/// Chamado a cada troca de thread: traps vindos de Ring 3 empilham o
/// `TrapFrame` no topo da kstack da thread corrente.
pub fn set_kernel_stack(stack_top: usize) {
    unsafe {
        (*(&raw mut TSS)).rsp0 = stack_top as u64;
    }
}
