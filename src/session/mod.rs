pub mod clock;
pub mod gate;
pub mod store;
pub mod token;
