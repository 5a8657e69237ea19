/// Arquivo: core/boot/multiboot.rs
///
/// Propósito: Estruturas passadas pelo bootloader (Multiboot v1).
/// Contém o mapa de memória, a linha de comando e o framebuffer.
///
/// Detalhes de Implementação:
/// - O magic é validado antes de a estrutura ser lida.
/// - `MultibootInfo` é copiada para dentro do kernel; o mapa de memória e a
///   linha de comando continuam na memória do bootloader (identidade).
/// - Entradas do mapa de memória têm tamanho variável: a próxima começa em
///   `size + 4` bytes depois da atual.
use core::mem::size_of;

/// Valor em EAX entregue por um bootloader Multiboot v1.
pub const BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;

/// Tipo de região disponível no mapa de memória.
pub const MEMORY_AVAILABLE: u32 = 1;

bitflags::bitflags! {
    /// Campos válidos de `MultibootInfo`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InfoFlags: u32 {
        const MEMORY = 1 << 0;
        const BOOT_DEVICE = 1 << 1;
        const CMDLINE = 1 << 2;
        const MODS = 1 << 3;
        const AOUT_SYMS = 1 << 4;
        const ELF_SHDR = 1 << 5;
        const MEM_MAP = 1 << 6;
        const DRIVE_INFO = 1 << 7;
        const CONFIG_TABLE = 1 << 8;
        const BOOT_LOADER_NAME = 1 << 9;
        const APM_TABLE = 1 << 10;
        const VIDEO_INFO = 1 << 11;
        const FRAMEBUFFER = 1 << 12;
    }
}

/// Layout binário da estrutura de informação Multiboot v1.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MultibootInfo {
    pub flags: u32,
    pub mem_lower: u32,
    pub mem_upper: u32,
    pub boot_device: u32,
    pub cmdline: u32,
    pub mods_count: u32,
    pub mods_addr: u32,
    pub syms: [u32; 4],
    pub mmap_length: u32,
    pub mmap_addr: u32,
    pub drives_length: u32,
    pub drives_addr: u32,
    pub config_table: u32,
    pub boot_loader_name: u32,
    pub apm_table: u32,
    pub vbe_control_info: u32,
    pub vbe_mode_info: u32,
    pub vbe_mode: u16,
    pub vbe_interface_seg: u16,
    pub vbe_interface_off: u16,
    pub vbe_interface_len: u16,
    pub framebuffer_addr: u64,
    pub framebuffer_pitch: u32,
    pub framebuffer_width: u32,
    pub framebuffer_height: u32,
    pub framebuffer_bpp: u8,
    pub framebuffer_type: u8,
    pub color_info: [u8; 6],
}

const _: () = assert!(size_of::<MultibootInfo>() == 116);

/// Uma entrada do mapa de memória.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryMapEntry {
    pub size: u32,
    pub addr: u64,
    pub len: u64,
    pub kind: u32,
}

const _: () = assert!(size_of::<MemoryMapEntry>() == 24);

impl MemoryMapEntry {
    #[inline]
    pub fn is_available(&self) -> bool {
        self.kind == MEMORY_AVAILABLE
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.addr + self.len
    }
}

/// Erros de validação do handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// EAX não continha `BOOTLOADER_MAGIC`.
    BadMagic(u32),
    /// Ponteiro de informação nulo.
    NullInfo,
}

/// Informação de boot validada.
#[derive(Debug, Clone, Copy)]
pub struct BootInfo {
    raw: MultibootInfo,
}

impl BootInfo {
    /// Valida `magic` e copia a estrutura em `addr`.
    ///
    /// # Safety
    /// Com o magic correto, `addr` deve apontar para uma `MultibootInfo`
    /// legível, e as regiões que ela referencia devem continuar mapeadas.
    pub unsafe fn from_raw(magic: u32, addr: usize) -> Result<Self, BootError> {
        if magic != BOOTLOADER_MAGIC {
            return Err(BootError::BadMagic(magic));
        }
        if addr == 0 {
            return Err(BootError::NullInfo);
        }
        let raw = core::ptr::read_unaligned(addr as *const MultibootInfo);
        Ok(Self { raw })
    }

    pub fn flags(&self) -> InfoFlags {
        InfoFlags::from_bits_truncate(self.raw.flags)
    }

    pub fn raw(&self) -> &MultibootInfo {
        &self.raw
    }

    /// Linha de comando (sem o NUL final), se o bootloader passou uma.
    ///
    /// # Safety
    /// A string deve continuar acessível (identidade) e terminada em NUL.
    pub unsafe fn cmdline(&self) -> Option<&'static [u8]> {
        if !self.flags().contains(InfoFlags::CMDLINE) || self.raw.cmdline == 0 {
            return None;
        }
        let ptr = self.raw.cmdline as usize as *const u8;
        let mut len = 0;
        while *ptr.add(len) != 0 {
            len += 1;
        }
        Some(core::slice::from_raw_parts(ptr, len))
    }

    /// Itera sobre o mapa de memória (vazio se o bootloader não o forneceu).
    pub fn memory_map(&self) -> MemoryMapIter {
        if !self.flags().contains(InfoFlags::MEM_MAP) {
            return MemoryMapIter { cur: 0, end: 0 };
        }
        let start = self.raw.mmap_addr as usize;
        MemoryMapIter {
            cur: start,
            end: start + self.raw.mmap_length as usize,
        }
    }

    /// (endereço, pitch, largura, altura, bpp) do framebuffer.
    pub fn framebuffer(&self) -> Option<(u64, u32, u32, u32, u8)> {
        if !self.flags().contains(InfoFlags::FRAMEBUFFER) {
            return None;
        }
        let r = self.raw;
        Some((
            r.framebuffer_addr,
            r.framebuffer_pitch,
            r.framebuffer_width,
            r.framebuffer_height,
            r.framebuffer_bpp,
        ))
    }
}

/// Iterador sobre entradas de tamanho variável do mapa de memória.
pub struct MemoryMapIter {
    cur: usize,
    end: usize,
}

impl Iterator for MemoryMapIter {
    type Item = MemoryMapEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur + size_of::<MemoryMapEntry>() > self.end {
            return None;
        }
        // SAFETY: região validada na criação do BootInfo
        let entry = unsafe { core::ptr::read_unaligned(self.cur as *const MemoryMapEntry) };
        self.cur += entry.size as usize + size_of::<u32>();
        Some(entry)
    }
}

/// Informação de boot global (definida uma vez em `kernel_main`).
pub static BOOT_INFO: spin::Once<BootInfo> = spin::Once::new();

/// Informação de boot, se já validada.
pub fn boot_info() -> Option<&'static BootInfo> {
    BOOT_INFO.get()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::vec::Vec;

    /// Constrói uma `MultibootInfo` em memória do host com um mapa e cmdline.
    pub(crate) struct FakeBoot {
        pub info: MultibootInfo,
        pub mmap: Vec<MemoryMapEntry>,
        pub cmdline: Vec<u8>,
    }

    impl FakeBoot {
        pub(crate) fn new(regions: &[(u64, u64, u32)], cmdline: &str) -> Self {
            let mmap: Vec<MemoryMapEntry> = regions
                .iter()
                .map(|&(addr, len, kind)| MemoryMapEntry {
                    size: 20,
                    addr,
                    len,
                    kind,
                })
                .collect();
            let mut cmd: Vec<u8> = cmdline.as_bytes().to_vec();
            cmd.push(0);
            let mut fb = Self {
                info: MultibootInfo::default(),
                mmap,
                cmdline: cmd,
            };
            fb.info.flags = (InfoFlags::MEM_MAP | InfoFlags::CMDLINE).bits();
            fb.info.mmap_length = (fb.mmap.len() * size_of::<MemoryMapEntry>()) as u32;
            fb
        }

        /// Ponteiro válido enquanto `self` vive. Endereços do host podem não
        /// caber em 32 bits, então os campos u32 são ignorados e o mapa é
        /// lido direto de `mmap`.
        pub(crate) fn info_ptr(&self) -> usize {
            &self.info as *const MultibootInfo as usize
        }
    }

    #[test]
    fn rejects_bad_magic() {
        let fb = FakeBoot::new(&[], "");
        let err = unsafe { BootInfo::from_raw(0x1BADB002, fb.info_ptr()) };
        assert_eq!(err.unwrap_err(), BootError::BadMagic(0x1BADB002));
    }

    #[test]
    fn rejects_null_info() {
        let err = unsafe { BootInfo::from_raw(BOOTLOADER_MAGIC, 0) };
        assert_eq!(err.unwrap_err(), BootError::NullInfo);
    }

    #[test]
    fn iterates_variable_size_entries() {
        let fb = FakeBoot::new(
            &[(0, 0x9FC00, 1), (0x100000, 255 << 20, 1), (0xFFFC0000, 0x40000, 2)],
            "",
        );
        let iter = MemoryMapIter {
            cur: fb.mmap.as_ptr() as usize,
            end: fb.mmap.as_ptr() as usize + fb.info.mmap_length as usize,
        };
        let entries: Vec<MemoryMapEntry> = iter.collect();
        assert_eq!(entries.len(), 3);
        assert!(entries[1].is_available());
        assert!(!entries[2].is_available());
        assert_eq!(entries[1].end(), 256 << 20);
    }

    #[test]
    fn flags_gate_optional_fields() {
        let mut fb = FakeBoot::new(&[], "");
        fb.info.flags = 0;
        let info = unsafe { BootInfo::from_raw(BOOTLOADER_MAGIC, fb.info_ptr()) }.unwrap();
        assert_eq!(info.memory_map().count(), 0);
        assert!(unsafe { info.cmdline() }.is_none());
        assert!(info.framebuffer().is_none());
    }
}
