pub mod aggregation_service;
pub mod export_service;
pub mod field_service;
pub mod import_service;
pub mod project_service;
pub mod template_service;
pub mod tier_service;
pub mod validation;
pub mod value_service;

pub use aggregation_service::AggregationService;
pub use export_service::ExportService;
pub use field_service::FieldService;
pub use import_service::{BulkImportProgress, ImportService};
pub use project_service::ProjectService;
pub use template_service::TemplateService;
pub use tier_service::TierService;
pub use validation::ValidationService;
pub use value_service::{ValueService, ValueWrite};
