//! Portas de I/O legadas do x86 (`in`/`out`).
//!
//! Usadas pelo PIC, PIT, CMOS e pela serial. O runtime hospedado roda com
//! IOPL=3, então drivers colaboradores também podem usá-las fora do kernel.

use core::marker::PhantomData;

/// Lê um byte de uma porta IO
#[inline]
#[cfg(not(test))]
pub fn inb(port: u16) -> u8 {
    let value: u8;
    // SAFETY: IO ports não tocam memória
    unsafe {
        core::arch::asm!(
            "in al, dx",
            in("dx") port,
            out("al") value,
            options(nomem, nostack, preserves_flags)
        );
    }
    value
}

/// Escreve um byte em uma porta IO
#[inline]
#[cfg(not(test))]
pub fn outb(port: u16, value: u8) {
    // SAFETY: IO ports não tocam memória
    unsafe {
        core::arch::asm!(
            "out dx, al",
            in("dx") port,
            in("al") value,
            options(nomem, nostack, preserves_flags)
        );
    }
}

/// Lê um dword (32 bits) de uma porta IO
#[inline]
#[cfg(not(test))]
pub fn inl(port: u16) -> u32 {
    let value: u32;
    unsafe {
        core::arch::asm!(
            "in eax, dx",
            in("dx") port,
            out("eax") value,
            options(nomem, nostack, preserves_flags)
        );
    }
    value
}

/// Escreve um dword em uma porta IO
#[inline]
#[cfg(not(test))]
pub fn outl(port: u16, value: u32) {
    unsafe {
        core::arch::asm!(
            "out dx, eax",
            in("dx") port,
            in("eax") value,
            options(nomem, nostack, preserves_flags)
        );
    }
}

// Processo de host não tem IOPL: leituras devolvem 0, escritas somem.
#[cfg(test)]
pub fn inb(_port: u16) -> u8 {
    0
}

#[cfg(test)]
pub fn outb(_port: u16, _value: u8) {}

#[cfg(test)]
pub fn inl(_port: u16) -> u32 {
    0
}

#[cfg(test)]
pub fn outl(_port: u16, _value: u32) {}

/// Delay de IO (escreve na porta de POST 0x80).
///
/// O 8259 precisa de um ciclo de barramento entre as palavras de comando.
#[inline]
pub fn io_wait() {
    outb(0x80, 0);
}

/// Largura de acesso de uma porta.
pub trait PortValue: Copy {
    fn read_from(port: u16) -> Self;
    fn write_to(port: u16, value: Self);
}

impl PortValue for u8 {
    #[inline]
    fn read_from(port: u16) -> Self {
        inb(port)
    }
    #[inline]
    fn write_to(port: u16, value: Self) {
        outb(port, value)
    }
}

impl PortValue for u32 {
    #[inline]
    fn read_from(port: u16) -> Self {
        inl(port)
    }
    #[inline]
    fn write_to(port: u16, value: Self) {
        outl(port, value)
    }
}

/// Porta de I/O tipada.
#[derive(Debug, Clone, Copy)]
pub struct Port<T: PortValue> {
    port: u16,
    _width: PhantomData<T>,
}

impl<T: PortValue> Port<T> {
    pub const fn new(port: u16) -> Self {
        Self {
            port,
            _width: PhantomData,
        }
    }

    #[inline]
    pub fn read(&self) -> T {
        T::read_from(self.port)
    }

    #[inline]
    pub fn write(&self, value: T) {
        T::write_to(self.port, value)
    }
}
