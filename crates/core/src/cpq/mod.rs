pub mod numbering;
pub mod pricing;

pub use numbering::{format_quote_number, next_sequence, parse_sequence, year_prefix};
pub use pricing::{compute_totals, round_money, LinePricing, IVA_RATE, MAX_LINE_AMOUNT};
