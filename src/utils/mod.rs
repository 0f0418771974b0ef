pub mod sort;
pub mod sparse;
