/// Decimal precision for valuation calculations
pub const DECIMAL_PRECISION: u32 = 6;

/// Pivot currency for all cross-rate conversions
pub const PIVOT_CURRENCY: &str = "USD";
