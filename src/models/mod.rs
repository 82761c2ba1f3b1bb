// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Embedding, JobAttributes, JobCandidate, JobMatch, Resume, ResumeFormat, ResumeMetadata};
pub use requests::{MatchRequest, UploadQuery};
pub use responses::{EmbedResumeResponse, ErrorResponse, HealthResponse, MatchMetadata, MatchResponse, MetadataSource};
