//! # Kernel Driver Layer
//!
//! Apenas os drivers que o núcleo de execução precisa para funcionar.
//! Drivers de dispositivos reais (teclado, rede, vídeo) são colaboradores
//! externos: registram traps e syscalls pelas APIs de `trap` e `syscall`.
//!
//! | Driver   | Arquivo      | Uso |
//! |----------|--------------|-----|
//! | Serial   | `serial.rs`  | Logs de kernel e console do runtime |
//! | PIC      | `pic.rs`     | Máscara de IRQs e EOI |
//! | Timer    | `timer.rs`   | PIT 8254: tick e correção sub-tick |
//! | CMOS     | `cmos.rs`    | RTC: base do relógio de parede |

pub mod cmos; // RTC - relógio de parede
pub mod pic; // 8259 PIC - Interrupções legacy
pub mod serial; // UART 16550 - Logs
pub mod timer; // PIT 8254 - Timer do sistema
