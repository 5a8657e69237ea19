//! Pipes do núcleo.
//!
//! Buffer circular de tamanho fixo, sempre não bloqueante: ler vazio ou
//! escrever cheio devolve EAGAIN e quem espera usa o epoll. Cada mudança
//! de estado notifica a outra ponta.
//!
//! O slot `i` tem leitura no fd `FIRST_PIPE_FD + 2i` e escrita no seguinte.

use super::epoll::{self, EpollEvents};
use crate::sync::Spinlock;
use crate::sys::{Errno, SysResult};

pub const PIPE_BUF_SIZE: usize = 256;
pub const FIRST_PIPE_FD: usize = 4;
pub const MAX_PIPES: usize = 32;

struct Pipe {
    buf: [u8; PIPE_BUF_SIZE],
    head: usize,
    len: usize,
    read_open: bool,
    write_open: bool,
}

impl Pipe {
    const fn new() -> Self {
        Self {
            buf: [0; PIPE_BUF_SIZE],
            head: 0,
            len: 0,
            read_open: true,
            write_open: true,
        }
    }

    fn pop(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len);
        for b in out.iter_mut().take(n) {
            *b = self.buf[self.head];
            self.head = (self.head + 1) % PIPE_BUF_SIZE;
        }
        self.len -= n;
        n
    }

    fn push(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(PIPE_BUF_SIZE - self.len);
        let mut tail = (self.head + self.len) % PIPE_BUF_SIZE;
        for &b in data.iter().take(n) {
            self.buf[tail] = b;
            tail = (tail + 1) % PIPE_BUF_SIZE;
        }
        self.len += n;
        n
    }
}

static PIPES: Spinlock<[Option<Pipe>; MAX_PIPES]> = Spinlock::new([const { None }; MAX_PIPES]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Read,
    Write,
}

fn decode_fd(fd: usize) -> Option<(usize, End)> {
    let off = fd.checked_sub(FIRST_PIPE_FD)?;
    let slot = off / 2;
    if slot >= MAX_PIPES {
        return None;
    }
    let end = if off % 2 == 0 { End::Read } else { End::Write };
    Some((slot, end))
}

const fn read_fd(slot: usize) -> usize {
    FIRST_PIPE_FD + 2 * slot
}

const fn write_fd(slot: usize) -> usize {
    read_fd(slot) + 1
}

/// `fd` é uma ponta aberta de algum pipe?
pub fn is_pipe(fd: usize) -> bool {
    let Some((slot, end)) = decode_fd(fd) else {
        return false;
    };
    match &PIPES.lock()[slot] {
        Some(p) => match end {
            End::Read => p.read_open,
            End::Write => p.write_open,
        },
        None => false,
    }
}

/// Cria um pipe. Retorna `(leitura, escrita)`.
pub fn pipe2() -> SysResult<(usize, usize)> {
    let mut pipes = PIPES.lock();
    let slot = pipes.iter().position(Option::is_none).ok_or(Errno::EMFILE)?;
    pipes[slot] = Some(Pipe::new());
    crate::ktrace!("(Pipe) novo, slot=", slot);
    Ok((read_fd(slot), write_fd(slot)))
}

pub fn read(fd: usize, out: &mut [u8]) -> SysResult {
    let (slot, end) = decode_fd(fd).ok_or(Errno::EBADF)?;
    if end != End::Read {
        return Err(Errno::EBADF);
    }
    let res = {
        let mut pipes = PIPES.lock();
        let p = pipes[slot].as_mut().filter(|p| p.read_open).ok_or(Errno::EBADF)?;
        if p.len == 0 && !p.write_open {
            return Ok(0);
        }
        match p.pop(out) {
            0 if !out.is_empty() => Err(Errno::EAGAIN),
            n => Ok(n),
        }
    };
    epoll::notify(write_fd(slot), EpollEvents::OUT);
    res
}

pub fn write(fd: usize, data: &[u8]) -> SysResult {
    let (slot, end) = decode_fd(fd).ok_or(Errno::EBADF)?;
    if end != End::Write {
        return Err(Errno::EBADF);
    }
    let res = {
        let mut pipes = PIPES.lock();
        let p = pipes[slot].as_mut().filter(|p| p.write_open).ok_or(Errno::EBADF)?;
        if !p.read_open {
            return Err(Errno::EPIPE);
        }
        match p.push(data) {
            0 if !data.is_empty() => Err(Errno::EAGAIN),
            n => Ok(n),
        }
    };
    epoll::notify(read_fd(slot), EpollEvents::IN);
    res
}

/// Fecha uma ponta. O slot volta a ficar livre quando as duas fecham.
pub fn close(fd: usize) -> SysResult {
    let (slot, end) = decode_fd(fd).ok_or(Errno::EBADF)?;
    let peer = {
        let mut pipes = PIPES.lock();
        let p = pipes[slot].as_mut().ok_or(Errno::EBADF)?;
        let (open, peer) = match end {
            End::Read => (&mut p.read_open, write_fd(slot)),
            End::Write => (&mut p.write_open, read_fd(slot)),
        };
        if !*open {
            return Err(Errno::EBADF);
        }
        *open = false;
        if !p.read_open && !p.write_open {
            pipes[slot] = None;
        }
        peer
    };
    epoll::notify(peer, EpollEvents::HUP);
    Ok(0)
}
