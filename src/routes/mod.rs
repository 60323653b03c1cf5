pub mod catalog;
pub mod persist;
pub mod roster;
pub mod rules;
pub mod util;
