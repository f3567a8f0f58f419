//! Resolution of compile inputs: inheritance chains and active extension sets

pub mod conditions;
pub mod extensions;
pub mod inheritance;

pub use extensions::{order_extensions, resolve_active};
pub use inheritance::{ChainMemo, InheritanceChain, resolve_chain};
