pub mod catalog;
pub mod delivery;
pub mod diagnostic;
pub mod documents;
pub mod intake;
pub mod render;
