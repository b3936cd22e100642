pub mod task;
pub mod user;

pub use task::{
    parse_task_id, Task, TaskChanges, TaskInput, TaskQuery, TaskStatus, TaskType, TaskUpdate,
};
pub use user::{NewUser, User, UserCredentials, UserProfile};
