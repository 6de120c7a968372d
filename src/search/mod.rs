pub mod executor;
pub mod results;
pub mod trec;
