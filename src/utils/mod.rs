pub mod math;

pub use math::{get_amount_out, min_amount_out, price_impact_bps};
