use serde::{Deserialize, Serialize};

/// Closed enumeration of field types. The wire and storage representation is
/// the snake_case string produced by `as_str`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Date,
    Time,
    Datetime,
    Color,
    Email,
    Phone,
    Textarea,
    Checkbox,
    Dropdown,
    Url,
    Code,
    Employee,
    MultiEmployee,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Datetime => "datetime",
            FieldType::Color => "color",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Textarea => "textarea",
            FieldType::Checkbox => "checkbox",
            FieldType::Dropdown => "dropdown",
            FieldType::Url => "url",
            FieldType::Code => "code",
            FieldType::Employee => "employee",
            FieldType::MultiEmployee => "multi_employee",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "date" => Some(FieldType::Date),
            "time" => Some(FieldType::Time),
            "datetime" => Some(FieldType::Datetime),
            "color" => Some(FieldType::Color),
            "email" => Some(FieldType::Email),
            "phone" => Some(FieldType::Phone),
            "textarea" => Some(FieldType::Textarea),
            "checkbox" => Some(FieldType::Checkbox),
            "dropdown" => Some(FieldType::Dropdown),
            "url" => Some(FieldType::Url),
            "code" => Some(FieldType::Code),
            "employee" => Some(FieldType::Employee),
            "multi_employee" => Some(FieldType::MultiEmployee),
            _ => None,
        }
    }

    /// Whether values of this type are stored in the numeric column and
    /// participate in aggregation. Checkboxes store 0/1.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Checkbox)
    }

    /// Dropdown fields carry a newline-delimited option list; no other type
    /// takes options.
    pub fn requires_options(&self) -> bool {
        matches!(self, FieldType::Dropdown)
    }
}
