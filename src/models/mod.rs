pub mod agent;
pub mod attribute;
pub mod log;
pub mod metric;
pub mod resource;
pub mod scope;
pub mod span;
