//! Database models.

pub mod course;
pub mod forum;
pub mod group;

pub use course::Course;
pub use forum::{Discussion, Forum, Post};
pub use group::CourseGroup;
