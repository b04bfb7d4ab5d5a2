pub mod prelude;

pub mod automations;
pub mod column_values;
pub mod columns;
pub mod results;
pub mod searches;
pub mod users;
