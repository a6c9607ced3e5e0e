pub mod flag;

pub use flag::*;

use std::collections::HashMap;

/// Outcome of one refresh cycle, handed to the presentation layer.
///
/// `tariffs` is the confirmed read-back of what was just persisted, never
/// the in-memory computed map.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshResult {
    pub tariffs: HashMap<TariffFlag, f64>,
    pub active_flag: FlagLabel,
}
