pub mod payout_world;
mod setups;
mod steps;

pub use payout_world::PayoutWorld;
