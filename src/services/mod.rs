pub mod analysis;
pub mod importer;
pub mod similarity;

pub use analysis::*;
pub use similarity::{ChromaClient, SimilarTeamsSource, VectorSimilarity};
