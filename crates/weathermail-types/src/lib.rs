//! Types shared between the weathermail crates: the fixed city list,
//! session claims and the JSON request/response bodies.

pub mod api;
pub mod city;

pub use city::{City, UnknownCity};
