pub(crate) mod exam_timing;
pub(crate) mod export;
pub(crate) mod generation;
pub(crate) mod google_auth;
pub(crate) mod grading;
