pub mod actor;
pub mod family;
pub mod plan;
pub mod proposal;
pub mod term;
