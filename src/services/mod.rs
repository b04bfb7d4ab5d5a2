pub mod ai;
pub use ai::AiService;

pub mod auth_service;
pub use auth_service::{AuthError, AuthService};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod automation;
pub use automation::{AutomationError, AutomationService};

pub mod columns;
pub use columns::{ColumnError, ColumnService};

pub mod export;
pub use export::{ExportError, ExportFormat, ExportService};

pub mod results;
pub use results::{ResultError, ResultService};

pub mod samples;

pub mod scheduler;
pub use scheduler::Scheduler;

pub mod search;
pub use search::SearchService;
