//! A comparison-only Thompson/Pike VM engine (supplemented feature, not
//! part of the memoized backtracking core). It never consults the memo
//! table or visit table and exists purely so the CLI and tests can check
//! the backtracking simulator's match outcome against a second,
//! unrelated implementation strategy.

pub mod pike_vm;

pub use pike_vm::PikeVm;
