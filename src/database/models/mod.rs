pub mod alert;
pub mod claim;
pub mod document;
pub mod feedback;
