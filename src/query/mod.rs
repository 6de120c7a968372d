pub mod ast;
pub mod iop;
pub mod sop;
pub mod parser;
