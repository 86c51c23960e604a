//! Domain types for orbkit

pub mod bar;
pub mod instrument;
pub mod order;
pub mod setup;

pub use bar::{Bar, Candle};
pub use instrument::{pip_size, pips_to_price, price_to_pips, QuoteFamily};
pub use order::{Bracket, OrderIntent, Side, TimeInForce};
pub use setup::{BracketMultiples, CandidateSetup};
