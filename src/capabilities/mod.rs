//! Built-in capability implementations
//!
//! Leaf agents can wrap any [`crate::capability::Capability`]; these are the
//! ones the stock agent trees use. Each is an external collaborator to the
//! core: it produces a single result or fails, nothing more.

pub mod arithmetic;
pub mod clock;
pub mod demographics;
pub mod model;
pub mod weather;

pub use arithmetic::ArithmeticCapability;
pub use clock::ClockCapability;
pub use demographics::DemographicsCapability;
pub use model::ModelCapability;
pub use weather::WeatherCapability;
