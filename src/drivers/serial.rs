// =============================================================================
// SERIAL DRIVER - ZERO OVERHEAD
// =============================================================================
//
// Driver de Porta Serial (COM1) para logging de kernel e saída de console do
// runtime hospedado.
//
// ARQUITETURA:
// - SEM Mutex/Spinlock - Escrita direta via I/O ports
// - SEM core::fmt - Apenas strings e valores imediatos
// - SEM alocação - Seguro no caminho de trap
//
// FUNÇÕES DISPONÍVEIS:
// - emit(byte)       : Envia um byte
// - emit_str(s)      : Envia string
// - emit_hex(v)      : Envia u64 em hexadecimal
// - emit_dec(v)      : Envia usize em decimal
// - emit_nl()        : Envia newline (\r\n)
// - write_bytes(buf) : Envia um buffer arbitrário (write em fd 1/2)
//
// Em builds de teste do host as funções de escrita não fazem nada.
//
// =============================================================================

#[cfg(not(test))]
use crate::arch::x86_64::ports::{inb, outb};

// Porta de dados da COM1
const COM1_DATA: u16 = 0x3F8;

// Porta de status da COM1 (Line Status Register)
const COM1_STATUS: u16 = COM1_DATA + 5;

// Bit 5 do LSR: buffer de transmissão vazio
const LSR_THR_EMPTY: u8 = 0x20;

// =============================================================================
// INICIALIZAÇÃO
// =============================================================================

/// Inicializa a porta serial COM1 (UART 16550).
///
/// Deve ser chamada uma vez durante o early-boot.
/// Configura: 38400 baud, 8N1, FIFO habilitado.
#[cfg(not(test))]
pub fn init() {
    // Desabilita interrupções da UART
    outb(COM1_DATA + 1, 0x00);
    // DLAB=1 para programar o divisor
    outb(COM1_DATA + 3, 0x80);
    // Divisor 3 = 38400 baud
    outb(COM1_DATA, 0x03);
    outb(COM1_DATA + 1, 0x00);
    // 8 bits, sem paridade, 1 stop bit
    outb(COM1_DATA + 3, 0x03);
    // FIFO habilitado, limpo, threshold de 14 bytes
    outb(COM1_DATA + 2, 0xC7);
    // RTS/DSR
    outb(COM1_DATA + 4, 0x0B);
}

#[cfg(test)]
pub fn init() {}

// =============================================================================
// ESCRITA - CORE
// =============================================================================

/// Envia um único byte para a porta serial (busy wait no LSR).
#[cfg(not(test))]
#[inline]
pub fn emit(byte: u8) {
    while inb(COM1_STATUS) & LSR_THR_EMPTY == 0 {
        core::hint::spin_loop();
    }
    outb(COM1_DATA, byte);
}

#[cfg(test)]
#[inline]
pub fn emit(_byte: u8) {
    let _ = (COM1_STATUS, LSR_THR_EMPTY);
}

/// Envia uma string para a porta serial.
#[inline(never)]
pub fn emit_str(s: &str) {
    write_bytes(s.as_bytes());
}

/// Envia um buffer arbitrário, traduzindo `\n` em `\r\n`.
#[inline(never)]
pub fn write_bytes(buf: &[u8]) {
    for &b in buf {
        if b == b'\n' {
            emit(b'\r');
        }
        emit(b);
    }
}

/// Envia newline (\r\n).
#[inline]
pub fn emit_nl() {
    emit(b'\r');
    emit(b'\n');
}

/// Envia um valor u64 em hexadecimal.
///
/// Formato de saída: 0x0000000000001000 (sempre 18 caracteres)
#[inline(never)]
pub fn emit_hex(value: u64) {
    emit(b'0');
    emit(b'x');
    let mut shift: i32 = 60;
    while shift >= 0 {
        emit(nibble_to_ascii(((value >> shift) & 0xF) as u8));
        shift -= 4;
    }
}

/// Envia um valor usize em formato decimal.
///
/// Útil para contadores e índices.
#[inline(never)]
pub fn emit_dec(mut value: usize) {
    // Buffer para dígitos (max 20 para u64)
    let mut buf: [u8; 20] = [0; 20];
    let mut pos = 20;

    if value == 0 {
        emit(b'0');
        return;
    }

    while value > 0 {
        pos -= 1;
        buf[pos] = b'0' + (value % 10) as u8;
        value /= 10;
    }

    for &b in &buf[pos..] {
        emit(b);
    }
}

/// Converte nibble (0-15) para caractere ASCII ('0'-'9', 'A'-'F').
#[inline(always)]
const fn nibble_to_ascii(n: u8) -> u8 {
    if n < 10 {
        b'0' + n
    } else {
        b'A' + (n - 10)
    }
}
