pub mod charts;
pub mod summary;
pub mod svg;
pub mod tables;
