//! Row decoders. Each table family has its own ordered strategy chain.

pub mod chromatography;
pub mod potency;
pub mod squashed;
