pub mod automation;
pub mod column;
pub mod result;
pub mod search;
pub mod user;
