pub mod analytics;
pub mod claims;
pub mod community;
pub mod documents;
