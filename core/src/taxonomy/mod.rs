pub mod assignments;
pub mod catalog;
