pub use super::automations::Entity as Automations;
pub use super::column_values::Entity as ColumnValues;
pub use super::columns::Entity as Columns;
pub use super::results::Entity as Results;
pub use super::searches::Entity as Searches;
pub use super::users::Entity as Users;
