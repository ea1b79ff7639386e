//! Queue pricing model: price-dependent arrival rates and the discretized
//! birth-death MDP built from them.

pub mod mdp;
pub mod rate;

pub use mdp::QueuePricingMdp;
pub use rate::arrival_rate;
