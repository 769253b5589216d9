pub mod form;
pub mod selection;
