//! Per-symbol session context.
//!
//! Holds the trailing state and the working protective order for each
//! symbol, plus an in-flight flag that keeps opens, closes, and sentinel
//! re-arms for the same symbol from interleaving. Different symbols never
//! contend beyond the short map lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::shared::Symbol;
use crate::domain::stop_enforcement::{ProtectiveOrderState, TrailingState};

/// Mutable protective context for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolSession {
    /// Ratcheting trailing state, once a fill price is known.
    pub trailing: Option<TrailingState>,
    /// The stop currently armed for the position.
    pub protective: Option<ProtectiveOrderState>,
}

#[derive(Debug, Default)]
struct Slot {
    session: SymbolSession,
    in_flight: bool,
}

/// Registry of per-symbol sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<Symbol, Slot>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every symbol in flight, or none of them.
    ///
    /// Empty symbols are ignored. Returns `None` if any symbol is already in
    /// flight; the returned guard clears the flags when dropped.
    #[must_use]
    pub fn try_begin(self: &Arc<Self>, symbols: &[Symbol]) -> Option<InFlightGuard> {
        let mut wanted: Vec<Symbol> = symbols.iter().filter(|s| !s.is_empty()).cloned().collect();
        wanted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        wanted.dedup();

        let mut slots = self.slots.lock();
        if wanted
            .iter()
            .any(|s| slots.get(s).is_some_and(|slot| slot.in_flight))
        {
            return None;
        }
        for symbol in &wanted {
            slots.entry(symbol.clone()).or_default().in_flight = true;
        }
        drop(slots);

        Some(InFlightGuard {
            registry: Arc::clone(self),
            symbols: wanted,
        })
    }

    /// True if the symbol has an entry or exit in progress.
    #[must_use]
    pub fn is_in_flight(&self, symbol: &Symbol) -> bool {
        self.slots
            .lock()
            .get(symbol)
            .is_some_and(|slot| slot.in_flight)
    }

    /// Copy of the symbol's session.
    #[must_use]
    pub fn snapshot(&self, symbol: &Symbol) -> SymbolSession {
        self.slots
            .lock()
            .get(symbol)
            .map(|slot| slot.session.clone())
            .unwrap_or_default()
    }

    /// Mutate the symbol's session under the map lock.
    pub fn update<R>(&self, symbol: &Symbol, f: impl FnOnce(&mut SymbolSession) -> R) -> R {
        let mut slots = self.slots.lock();
        f(&mut slots.entry(symbol.clone()).or_default().session)
    }

    /// Forget the symbol's protective context.
    pub fn reset(&self, symbol: &Symbol) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(symbol) {
            slot.session = SymbolSession::default();
            if !slot.in_flight {
                slots.remove(symbol);
            }
        }
    }

    fn release(&self, symbols: &[Symbol]) {
        let mut slots = self.slots.lock();
        for symbol in symbols {
            if let Some(slot) = slots.get_mut(symbol) {
                slot.in_flight = false;
            }
        }
    }
}

/// Clears the in-flight flags of its symbols on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<SessionRegistry>,
    symbols: Vec<Symbol>,
}

impl InFlightGuard {
    /// Symbols held by this guard.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.release(&self.symbols);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    #[test]
    fn guard_blocks_same_symbol_until_dropped() {
        let registry = Arc::new(SessionRegistry::new());

        let guard = registry.try_begin(&[sym("AAPL")]).unwrap();
        assert!(registry.is_in_flight(&sym("AAPL")));
        assert!(registry.try_begin(&[sym("AAPL")]).is_none());

        drop(guard);
        assert!(!registry.is_in_flight(&sym("AAPL")));
        assert!(registry.try_begin(&[sym("AAPL")]).is_some());
    }

    #[test]
    fn other_symbols_are_independent() {
        let registry = Arc::new(SessionRegistry::new());
        let _aapl = registry.try_begin(&[sym("AAPL")]).unwrap();
        assert!(registry.try_begin(&[sym("MSFT")]).is_some());
    }

    #[test]
    fn multi_symbol_begin_is_all_or_nothing() {
        let registry = Arc::new(SessionRegistry::new());
        let _held = registry.try_begin(&[sym("B")]).unwrap();

        assert!(registry.try_begin(&[sym("A"), sym("B")]).is_none());
        assert!(!registry.is_in_flight(&sym("A")));
    }

    #[test]
    fn empty_symbols_are_skipped() {
        let registry = Arc::new(SessionRegistry::new());
        let guard = registry.try_begin(&[sym(""), sym("SPY")]).unwrap();
        assert_eq!(guard.symbols(), &[sym("SPY")]);
    }

    #[test]
    fn update_and_reset_session() {
        let registry = SessionRegistry::new();
        registry.update(&sym("AAPL"), |s| {
            s.trailing = Some(TrailingState::new(dec!(100)));
        });
        assert!(registry.snapshot(&sym("AAPL")).trailing.is_some());

        registry.reset(&sym("AAPL"));
        assert_eq!(registry.snapshot(&sym("AAPL")), SymbolSession::default());
    }
}
