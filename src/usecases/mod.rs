//! Application use cases. Orchestrate domain logic via ports.

pub mod migrate_service;
pub mod plan_service;
pub mod preview_service;
pub mod template_service;
pub mod validate_service;

pub use migrate_service::{MigrateOptions, MigrateService};
pub use plan_service::PlanService;
pub use preview_service::PreviewService;
pub use template_service::TemplateService;
pub use validate_service::ValidateService;
