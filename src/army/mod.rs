//! Army list building: catalogs, the roster, eligibility rules and roster
//! validation. State lives in WASM memory (thread_local) for the lifetime of
//! the Web Worker.

pub mod catalog;
pub mod eligibility;
pub mod error;
pub mod model;
pub mod persist;
pub mod roster;
pub mod rules;
pub mod state;
pub mod validator;
