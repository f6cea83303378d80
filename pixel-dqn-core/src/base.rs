//! Core functionalities.
mod act;
mod agent;
mod env;
mod policy;
mod value;
pub use act::DiscreteAct;
pub use agent::Agent;
pub use env::{Env, ObsFilter, Observation};
pub use policy::Policy;
pub use value::ValueApproximator;
