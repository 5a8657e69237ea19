//! Relógio de tempo real (RTC) do CMOS.
//!
//! Lido uma única vez depois do boot para ancorar o relógio de parede.
//! Os registradores estão em BCD; a leitura é repetida até que os segundos
//! não mudem no meio dela.

use crate::arch::x86_64::ports::{inb, outb};

const CMOS_ADDR: u16 = 0x70;
const CMOS_DATA: u16 = 0x71;

// Bit 7 da porta de endereço desabilita NMI durante o acesso
const NMI_DISABLE: u8 = 0x80;

const REG_SECOND: u8 = 0x00;
const REG_MINUTE: u8 = 0x02;
const REG_HOUR: u8 = 0x04;
const REG_DAY: u8 = 0x07;
const REG_MONTH: u8 = 0x08;
const REG_YEAR: u8 = 0x09;
const REG_CENTURY: u8 = 0x32;

/// Data/hora lida do CMOS (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CmosTime {
    pub second: u32,
    pub minute: u32,
    pub hour: u32,
    pub day: u32,
    pub month: u32,
    pub year: u32,
}

impl CmosTime {
    /// Segundos desde a época Unix.
    pub fn unix_seconds(&self) -> i64 {
        let days = days_from_civil(self.year as i64, self.month as i64, self.day as i64);
        days * 86_400 + (self.hour as i64) * 3600 + (self.minute as i64) * 60 + self.second as i64
    }
}

/// Decodifica um byte BCD.
#[inline]
pub const fn bcd_decode(v: u8) -> u32 {
    (v & 0x0F) as u32 + (v >> 4) as u32 * 10
}

/// Dias desde 1970-01-01 para uma data do calendário gregoriano.
pub fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn read_reg(reg: u8) -> u8 {
    outb(CMOS_ADDR, NMI_DISABLE | reg);
    inb(CMOS_DATA)
}

fn read_once() -> CmosTime {
    CmosTime {
        year: bcd_decode(read_reg(REG_YEAR)) + bcd_decode(read_reg(REG_CENTURY)) * 100,
        month: bcd_decode(read_reg(REG_MONTH)),
        day: bcd_decode(read_reg(REG_DAY)),
        hour: bcd_decode(read_reg(REG_HOUR)),
        minute: bcd_decode(read_reg(REG_MINUTE)),
        second: bcd_decode(read_reg(REG_SECOND)),
    }
}

/// Lê o RTC até obter uma leitura consistente.
pub fn read_time() -> CmosTime {
    loop {
        let t = read_once();
        if bcd_decode(read_reg(REG_SECOND)) == t.second {
            return t;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_values() {
        assert_eq!(bcd_decode(0x00), 0);
        assert_eq!(bcd_decode(0x59), 59);
        assert_eq!(bcd_decode(0x20), 20);
        assert_eq!(bcd_decode(0x12), 12);
    }

    #[test]
    fn epoch_is_day_zero() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
    }

    #[test]
    fn unix_seconds_of_known_date() {
        // 2021-06-15 12:34:56 UTC
        let t = CmosTime {
            second: 56,
            minute: 34,
            hour: 12,
            day: 15,
            month: 6,
            year: 2021,
        };
        assert_eq!(t.unix_seconds(), 1_623_760_496);
    }
}
