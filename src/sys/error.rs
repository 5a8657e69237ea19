//! # Standard Error Codes (Errno)
//!
//! Códigos de erro retornados pelo kernel ao runtime hospedado.
//!
//! O runtime emite syscalls Linux cruas e interpreta o retorno com a
//! convenção do Linux x86_64, então a numeração segue exatamente a do Linux.
//! O valor negativo (`-errno`) vai no próprio registrador de retorno.

/// Resultado de uma syscall: valor de retorno ou errno.
pub type SysResult<T = usize> = Result<T, Errno>;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    EPERM = 1,        // Operation not permitted
    ENOENT = 2,       // No such file or directory
    ESRCH = 3,        // No such process
    EINTR = 4,        // Interrupted system call
    EIO = 5,          // I/O error
    EBADF = 9,        // Bad file number
    EAGAIN = 11,      // Try again
    ENOMEM = 12,      // Out of memory
    EACCES = 13,      // Permission denied
    EFAULT = 14,      // Bad address
    EBUSY = 16,       // Device or resource busy
    EEXIST = 17,      // File exists
    EINVAL = 22,      // Invalid argument
    EMFILE = 24,      // Too many open files
    ENOSPC = 28,      // No space left on device
    ESPIPE = 29,      // Illegal seek
    EPIPE = 32,       // Broken pipe
    ERANGE = 34,      // Math result not representable
    ENOSYS = 38,      // Function not implemented
    ETIMEDOUT = 110,  // Connection timed out
}

impl Errno {
    /// Valor positivo do errno.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Valor negativo (como retornado em RAX).
    #[inline]
    pub const fn as_isize(self) -> isize {
        -(self as i32 as isize)
    }

    /// Palavra de retorno da syscall (`-errno` em complemento de dois).
    #[inline]
    pub const fn as_word(self) -> usize {
        self.as_isize() as usize
    }

    /// Converte de um errno positivo.
    pub fn from_i32(v: i32) -> Option<Self> {
        Some(match v {
            1 => Self::EPERM,
            2 => Self::ENOENT,
            3 => Self::ESRCH,
            4 => Self::EINTR,
            5 => Self::EIO,
            9 => Self::EBADF,
            11 => Self::EAGAIN,
            12 => Self::ENOMEM,
            13 => Self::EACCES,
            14 => Self::EFAULT,
            16 => Self::EBUSY,
            17 => Self::EEXIST,
            22 => Self::EINVAL,
            24 => Self::EMFILE,
            28 => Self::ENOSPC,
            29 => Self::ESPIPE,
            32 => Self::EPIPE,
            34 => Self::ERANGE,
            38 => Self::ENOSYS,
            110 => Self::ETIMEDOUT,
            _ => return None,
        })
    }

    /// Nome curto (para logs).
    pub const fn name(self) -> &'static str {
        match self {
            Self::EPERM => "EPERM",
            Self::ENOENT => "ENOENT",
            Self::ESRCH => "ESRCH",
            Self::EINTR => "EINTR",
            Self::EIO => "EIO",
            Self::EBADF => "EBADF",
            Self::EAGAIN => "EAGAIN",
            Self::ENOMEM => "ENOMEM",
            Self::EACCES => "EACCES",
            Self::EFAULT => "EFAULT",
            Self::EBUSY => "EBUSY",
            Self::EEXIST => "EEXIST",
            Self::EINVAL => "EINVAL",
            Self::EMFILE => "EMFILE",
            Self::ENOSPC => "ENOSPC",
            Self::ESPIPE => "ESPIPE",
            Self::EPIPE => "EPIPE",
            Self::ERANGE => "ERANGE",
            Self::ENOSYS => "ENOSYS",
            Self::ETIMEDOUT => "ETIMEDOUT",
        }
    }
}
