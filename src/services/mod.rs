pub mod drafts;
pub mod generation;
pub mod storage;
pub mod tryon;
