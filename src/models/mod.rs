// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{AudienceMember, AudiencePage, AudienceResult, FilterCriteria, IntRange, Page, Panelist};
pub use requests::{AudienceCountRequest, AudienceRequest, FilterInput};
pub use responses::{AudienceCountResponse, ErrorResponse, HealthResponse};
