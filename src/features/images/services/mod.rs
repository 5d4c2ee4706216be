mod artifact_service;

pub use artifact_service::{parse_generated_name, ArtifactStore, ImageArtifactService};
