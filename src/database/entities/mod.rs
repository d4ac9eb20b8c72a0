pub mod field_templates;
pub mod field_type;
pub mod projects;
pub mod template_fields;
pub mod tier_data;
pub mod tier_fields;
pub mod tiers;
pub mod users;

pub use field_type::FieldType;
