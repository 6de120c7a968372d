pub mod posting;
pub mod reader;
pub mod term_vector;
pub mod memory;
