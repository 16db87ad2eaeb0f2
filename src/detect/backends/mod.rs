pub mod remote;
pub mod synthetic;

pub use remote::{ImageUploader, RemoteBackend, WorkflowClient};
pub use synthetic::SyntheticGenerator;
