mod amount;

pub mod helpers;
pub mod op;

pub use amount::{Amount, AmountParseError, MICROS_PER_UNIT};
