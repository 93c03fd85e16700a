pub mod jwt;
pub mod observable;
pub mod single_flight;

pub use observable::{StateCell, Transition};
pub use single_flight::SingleFlight;
