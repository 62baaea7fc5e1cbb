pub mod filename;
pub mod participant;
