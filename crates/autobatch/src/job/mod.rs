pub mod catalogue;
pub mod model;

pub use catalogue::{BucketSnapshot, JobCatalogue};
pub use model::{Bucket, Job, JobStatus, ProcessType};
