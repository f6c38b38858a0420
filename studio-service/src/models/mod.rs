pub mod relationship;
pub mod student;
pub mod user;

pub use relationship::{StudioInstructor, StudioStudent};
pub use student::{Student, StudentProfileUpdate, StudioClient};
pub use user::{NewUser, UserRecord, UserResponse, UserType};
