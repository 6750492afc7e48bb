pub mod analytics_service;
pub mod claim_service;
pub mod community_service;
pub mod document_service;
pub mod event_service;
