//! # Sinais
//!
//! Tabela de ações (global: existe um único processo), máscara, pendências
//! e pilha alternativa por thread. A entrega em si fica em `delivery`.
//!
//! Sinais são numerados a partir de 1; o bit `sig - 1` representa o sinal
//! nas máscaras de 64 bits (`sigset_t` do Linux). Números acima de 64
//! aceitam ação mas não podem ser bloqueados nem ficar pendentes.

pub mod delivery;

use crate::sync::Spinlock;
use crate::sys::{Errno, SysResult};

pub use delivery::{deliver_pending, rt_sigreturn, setup_frame, SigContext, SigInfo, UContext};

/// Tamanho da tabela de ações
pub const NSIG: usize = 128;

pub const SIGKILL: usize = 9;
pub const SIGSEGV: usize = 11;
pub const SIGSTOP: usize = 19;

/// Handlers especiais
pub const SIG_DFL: usize = 0;
pub const SIG_IGN: usize = 1;

pub const SA_SIGINFO: u64 = 0x0000_0004;
pub const SA_RESTORER: u64 = 0x0400_0000;
pub const SA_ONSTACK: u64 = 0x0800_0000;
pub const SA_NODEFER: u64 = 0x4000_0000;
pub const SA_RESETHAND: u64 = 0x8000_0000;

pub const SS_ONSTACK: i32 = 1;
pub const SS_DISABLE: i32 = 2;

/// `struct sigaction` do kernel Linux x86_64.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct SigAction {
    pub handler: usize,
    pub flags: u64,
    pub restorer: usize,
    pub mask: u64,
}

impl SigAction {
    pub const DEFAULT: Self = Self {
        handler: SIG_DFL,
        flags: 0,
        restorer: 0,
        mask: 0,
    };
}

/// `stack_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct StackT {
    pub ss_sp: usize,
    pub ss_flags: i32,
    pub ss_size: usize,
}

impl StackT {
    pub const fn disabled() -> Self {
        Self {
            ss_sp: 0,
            ss_flags: SS_DISABLE,
            ss_size: 0,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.ss_flags & SS_DISABLE == 0 && self.ss_sp != 0
    }

    /// `sp` está dentro da pilha?
    #[inline]
    pub fn contains(&self, sp: usize) -> bool {
        self.is_enabled() && sp > self.ss_sp && sp <= self.ss_sp + self.ss_size
    }
}

impl Default for StackT {
    fn default() -> Self {
        Self::disabled()
    }
}

/// `how` do rt_sigprocmask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskHow {
    Block = 0,
    Unblock = 1,
    SetMask = 2,
}

impl MaskHow {
    pub fn from_raw(how: usize) -> SysResult<Self> {
        match how {
            0 => Ok(Self::Block),
            1 => Ok(Self::Unblock),
            2 => Ok(Self::SetMask),
            _ => Err(Errno::EINVAL),
        }
    }
}

/// Estado de sinais de uma thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalState {
    pub mask: u64,
    pub pending: u64,
    pub altstack: StackT,
}

impl SignalState {
    pub const fn new() -> Self {
        Self {
            mask: 0,
            pending: 0,
            altstack: StackT::disabled(),
        }
    }

    /// rt_sigprocmask sobre esta thread. Devolve a máscara anterior.
    pub fn procmask(&mut self, how: MaskHow, set: Option<u64>) -> u64 {
        let old = self.mask;
        if let Some(set) = set {
            self.mask = match how {
                MaskHow::Block => self.mask | set,
                MaskHow::Unblock => self.mask & !set,
                MaskHow::SetMask => set,
            };
            // SIGKILL e SIGSTOP nunca ficam bloqueados
            self.mask &= !(sig_bit(SIGKILL) | sig_bit(SIGSTOP));
        }
        old
    }

    /// sigaltstack sobre esta thread. Devolve a pilha anterior.
    pub fn sigaltstack(&mut self, new: Option<&StackT>) -> SysResult<StackT> {
        let old = self.altstack;
        if let Some(new) = new {
            if new.ss_flags & !(SS_DISABLE | SS_ONSTACK) != 0 {
                return Err(Errno::EINVAL);
            }
            self.altstack = *new;
        }
        Ok(old)
    }

    /// Marca `sig` como pendente.
    pub fn raise(&mut self, sig: usize) -> SysResult<()> {
        if sig == 0 || sig > 64 {
            return Err(Errno::EINVAL);
        }
        self.pending |= sig_bit(sig);
        Ok(())
    }

    /// Retira o menor sinal pendente e não bloqueado.
    pub fn take_deliverable(&mut self) -> Option<usize> {
        let ready = self.pending & !self.mask;
        if ready == 0 {
            return None;
        }
        let sig = ready.trailing_zeros() as usize + 1;
        self.pending &= !sig_bit(sig);
        Some(sig)
    }
}

impl Default for SignalState {
    fn default() -> Self {
        Self::new()
    }
}

/// Bit de `sig` numa máscara de 64 bits (0 para sinais fora da faixa).
#[inline]
pub const fn sig_bit(sig: usize) -> u64 {
    if sig == 0 || sig > 64 {
        0
    } else {
        1 << (sig - 1)
    }
}

/// Tabela de ações.
pub struct ActionTable {
    actions: [SigAction; NSIG],
}

impl ActionTable {
    pub const fn new() -> Self {
        Self {
            actions: [SigAction::DEFAULT; NSIG],
        }
    }

    /// rt_sigaction: instala `new` (se dado) e devolve a ação anterior.
    pub fn sigaction(&mut self, sig: usize, new: Option<&SigAction>) -> SysResult<SigAction> {
        if sig == 0 || sig >= NSIG {
            return Err(Errno::EINVAL);
        }
        let old = self.actions[sig];
        if let Some(new) = new {
            if sig == SIGKILL || sig == SIGSTOP {
                return Err(Errno::EINVAL);
            }
            self.actions[sig] = *new;
        }
        Ok(old)
    }

    pub fn get(&self, sig: usize) -> SigAction {
        self.actions.get(sig).copied().unwrap_or(SigAction::DEFAULT)
    }

    /// `SA_RESETHAND`: volta para a ação padrão após uma entrega.
    pub fn reset(&mut self, sig: usize) {
        if let Some(a) = self.actions.get_mut(sig) {
            *a = SigAction::DEFAULT;
        }
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Ações do processo.
pub static ACTIONS: Spinlock<ActionTable> = Spinlock::new(ActionTable::new());

/// Sinais cuja ação padrão é ignorar.
pub fn ignored_by_default(sig: usize) -> bool {
    // SIGCHLD, SIGURG, SIGWINCH
    matches!(sig, 17 | 23 | 28)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigaction_returns_previous_action() {
        let mut t = ActionTable::new();
        let act = SigAction {
            handler: 0x40_1000,
            flags: SA_SIGINFO | SA_ONSTACK | SA_RESTORER,
            restorer: 0x40_2000,
            mask: !0,
        };
        assert_eq!(t.sigaction(SIGSEGV, Some(&act)), Ok(SigAction::DEFAULT));
        assert_eq!(t.sigaction(SIGSEGV, None), Ok(act));
        assert_eq!(t.get(SIGSEGV).handler, 0x40_1000);
    }

    #[test]
    fn sigaction_rejects_out_of_range_and_kill() {
        let mut t = ActionTable::new();
        assert_eq!(t.sigaction(0, None), Err(Errno::EINVAL));
        assert_eq!(t.sigaction(NSIG, None), Err(Errno::EINVAL));
        assert_eq!(t.sigaction(SIGKILL, Some(&SigAction::DEFAULT)), Err(Errno::EINVAL));
        // consultar SIGKILL é permitido
        assert!(t.sigaction(SIGKILL, None).is_ok());
        // números altos aceitam ação
        assert!(t.sigaction(100, Some(&SigAction::DEFAULT)).is_ok());
    }

    #[test]
    fn procmask_block_unblock_setmask() {
        let mut s = SignalState::new();
        assert_eq!(s.procmask(MaskHow::Block, Some(0b1010)), 0);
        assert_eq!(s.procmask(MaskHow::Unblock, Some(0b0010)), 0b1010);
        assert_eq!(s.procmask(MaskHow::SetMask, Some(0b0100)), 0b1000);
        assert_eq!(s.procmask(MaskHow::Block, None), 0b0100);
        assert_eq!(MaskHow::from_raw(3), Err(Errno::EINVAL));
    }

    #[test]
    fn kill_and_stop_cannot_be_blocked() {
        let mut s = SignalState::new();
        s.procmask(MaskHow::SetMask, Some(!0));
        assert_eq!(s.mask & sig_bit(SIGKILL), 0);
        assert_eq!(s.mask & sig_bit(SIGSTOP), 0);
    }

    #[test]
    fn altstack_swap() {
        let mut s = SignalState::new();
        let st = StackT {
            ss_sp: 0x8000,
            ss_flags: 0,
            ss_size: 0x2000,
        };
        assert_eq!(s.sigaltstack(Some(&st)), Ok(StackT::disabled()));
        assert!(s.altstack.contains(0x9000));
        assert!(!s.altstack.contains(0x8000));
        let bad = StackT { ss_flags: 8, ..st };
        assert_eq!(s.sigaltstack(Some(&bad)), Err(Errno::EINVAL));
    }

    #[test]
    fn pending_respects_mask_and_order() {
        let mut s = SignalState::new();
        s.raise(23).unwrap();
        s.raise(11).unwrap();
        s.procmask(MaskHow::Block, Some(sig_bit(11)));

        assert_eq!(s.take_deliverable(), Some(23));
        assert_eq!(s.take_deliverable(), None);
        s.procmask(MaskHow::SetMask, Some(0));
        assert_eq!(s.take_deliverable(), Some(11));
        assert_eq!(s.raise(65), Err(Errno::EINVAL));
    }
}
