//! Pure tariff valuation: base tariff plus the per-flag surcharge.

use std::collections::HashMap;

use strum::IntoEnumIterator;

use crate::domain::TariffFlag;

/// Combine a base tariff with per-flag surcharges into the final per-flag
/// tariffs.
///
/// `surcharges` must contain every flag; the query client always produces
/// all four. A missing flag is a caller bug, not a recoverable condition.
pub fn compute_final_tariffs(
    base: f64,
    surcharges: &HashMap<TariffFlag, f64>,
) -> HashMap<TariffFlag, f64> {
    TariffFlag::iter()
        .map(|flag| (flag, base + surcharges[&flag]))
        .collect()
}
