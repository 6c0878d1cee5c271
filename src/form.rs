//! Translates a backend form schema into renderable fields.
//!
//! Rendering never fails as a whole: a field with an unknown `type` turns into
//! a [`Control::Unsupported`] warning and the remaining fields render as usual.
//! `required` is carried for display only and is not enforced anywhere.

use serde_json::Value;
use tracing::warn;

use crate::models::{FieldDescriptor, FieldKind, FieldOption, scalar_text};

pub const CHOOSE_PLACEHOLDER: &str = "Choose an option...";
pub const MULTISELECT_HINT: &str = "Space toggles the highlighted option";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Text {
        default: String,
        placeholder: Option<String>,
    },
    Number {
        default: String,
        placeholder: Option<String>,
        min: Option<f64>,
        max: Option<f64>,
    },
    TextArea {
        default: String,
        placeholder: Option<String>,
    },
    Checkbox {
        checked: bool,
    },
    /// `options[0]` is always the empty "choose" placeholder.
    Select {
        options: Vec<ChoiceOption>,
        selected: usize,
    },
    MultiSelect {
        options: Vec<ChoiceOption>,
        hint: &'static str,
    },
    Unsupported {
        field_type: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderableField {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub control: Control,
}

impl RenderableField {
    pub fn is_warning(&self) -> bool {
        matches!(self.control, Control::Unsupported { .. })
    }

    /// Label with the cosmetic required marker.
    pub fn display_label(&self) -> String {
        if self.required {
            format!("{} *", self.label)
        } else {
            self.label.clone()
        }
    }
}

pub fn render(fields: &[FieldDescriptor]) -> Vec<RenderableField> {
    fields.iter().map(render_field).collect()
}

pub fn render_field(field: &FieldDescriptor) -> RenderableField {
    let control = match FieldKind::parse(&field.field_type) {
        Some(FieldKind::Text) => Control::Text {
            default: default_text(field.default.as_ref()),
            placeholder: field.placeholder.clone(),
        },
        Some(FieldKind::Number) => Control::Number {
            default: default_text(field.default.as_ref()),
            placeholder: field.placeholder.clone(),
            min: field.min,
            max: field.max,
        },
        Some(FieldKind::TextArea) => Control::TextArea {
            default: default_text(field.default.as_ref()),
            placeholder: field.placeholder.clone(),
        },
        Some(FieldKind::Checkbox) => Control::Checkbox {
            checked: truthy(field.default.as_ref()),
        },
        Some(FieldKind::Select) => {
            let mut options = vec![ChoiceOption {
                value: String::new(),
                label: CHOOSE_PLACEHOLDER.to_string(),
            }];
            options.extend(normalize_options(&field.options));
            let selected = field
                .default
                .as_ref()
                .and_then(scalar_text)
                .and_then(|default| options.iter().skip(1).position(|o| o.value == default))
                .map_or(0, |i| i + 1);
            Control::Select { options, selected }
        }
        // declared defaults are ignored for multiselect
        Some(FieldKind::MultiSelect) => Control::MultiSelect {
            options: normalize_options(&field.options),
            hint: MULTISELECT_HINT,
        },
        None => {
            warn!(field = %field.name, field_type = %field.field_type, "Unsupported field type");
            Control::Unsupported {
                field_type: field.field_type.clone(),
            }
        }
    };

    RenderableField {
        name: field.name.clone(),
        label: if field.label.is_empty() {
            field.name.clone()
        } else {
            field.label.clone()
        },
        required: field.required,
        control,
    }
}

pub fn normalize_options(options: &[FieldOption]) -> Vec<ChoiceOption> {
    options
        .iter()
        .map(|opt| {
            let (value, label) = opt.normalize();
            ChoiceOption { value, label }
        })
        .collect()
}

/// Initial text of an input. Falsy defaults (`null`, `false`, `0`) leave it
/// empty.
fn default_text(default: Option<&Value>) -> String {
    match default {
        Some(value) if truthy(Some(value)) => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        _ => String::new(),
    }
}

fn truthy(default: Option<&Value>) -> bool {
    match default {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(value: Value) -> FieldDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn unknown_type_yields_one_warning_and_keeps_the_rest() {
        let fields = vec![
            descriptor(json!({"name":"who","label":"Who","type":"text"})),
            descriptor(json!({"name":"when","label":"When","type":"date"})),
            descriptor(json!({"name":"n","label":"N","type":"number","min":1,"max":10})),
        ];
        let rendered = render(&fields);
        assert_eq!(rendered.len(), 3);
        assert_eq!(rendered.iter().filter(|f| f.is_warning()).count(), 1);
        assert_eq!(
            rendered[1].control,
            Control::Unsupported {
                field_type: "date".into()
            }
        );
        assert!(matches!(rendered[0].control, Control::Text { .. }));
        assert_eq!(
            rendered[2].control,
            Control::Number {
                default: String::new(),
                placeholder: None,
                min: Some(1.0),
                max: Some(10.0),
            }
        );
    }

    #[test]
    fn text_passes_through_default_and_placeholder() {
        let field = descriptor(json!({
            "name":"greeting","label":"Greeting","type":"textarea",
            "required":true,"default":"hi","placeholder":"say something"
        }));
        let rendered = render_field(&field);
        assert!(rendered.required);
        assert_eq!(rendered.display_label(), "Greeting *");
        assert_eq!(
            rendered.control,
            Control::TextArea {
                default: "hi".into(),
                placeholder: Some("say something".into()),
            }
        );
    }

    #[test]
    fn numeric_default_becomes_text() {
        let field = descriptor(json!({"name":"n","label":"N","type":"number","default":3}));
        assert!(matches!(
            render_field(&field).control,
            Control::Number { ref default, .. } if default == "3"
        ));
    }

    #[test]
    fn falsy_defaults_leave_inputs_empty() {
        for default in [json!(0), json!(false), json!(null), json!("")] {
            let field = descriptor(json!({"name":"n","type":"number","default":default}));
            assert!(matches!(
                render_field(&field).control,
                Control::Number { ref default, .. } if default.is_empty()
            ));
        }
    }

    #[test]
    fn numeric_options_match_numeric_default() {
        let field = descriptor(json!({
            "name":"level","type":"select","default":2,
            "options":[{"value":1,"label":"One"},{"value":2,"label":"Two"},3]
        }));
        let Control::Select { options, selected } = render_field(&field).control else {
            panic!("expected select");
        };
        assert_eq!(options[1].value, "1");
        assert_eq!(options[3].label, "3");
        assert_eq!(selected, 2);
    }

    #[test]
    fn missing_type_renders_as_warning() {
        let field = FieldDescriptor::from_entry(0, json!({"name":"x","label":"X"}));
        let rendered = render_field(&field);
        assert!(rendered.is_warning());
        assert_eq!(rendered.label, "X");
    }

    #[test]
    fn checkbox_default_is_boolean() {
        let on = descriptor(json!({"name":"c","label":"C","type":"checkbox","default":true}));
        let off = descriptor(json!({"name":"c","label":"C","type":"checkbox"}));
        assert_eq!(render_field(&on).control, Control::Checkbox { checked: true });
        assert_eq!(render_field(&off).control, Control::Checkbox { checked: false });
    }

    #[test]
    fn select_prepends_placeholder_and_preselects_default() {
        let field = descriptor(json!({
            "name":"env","label":"Env","type":"select","default":"prod",
            "options":["dev", {"value":"prod","label":"Production"}]
        }));
        let Control::Select { options, selected } = render_field(&field).control else {
            panic!("expected select");
        };
        assert_eq!(options[0].value, "");
        assert_eq!(options[0].label, CHOOSE_PLACEHOLDER);
        assert_eq!(options[1].label, "dev");
        assert_eq!(options[2].label, "Production");
        assert_eq!(selected, 2);
    }

    #[test]
    fn select_without_matching_default_starts_on_placeholder() {
        let field = descriptor(json!({
            "name":"env","label":"Env","type":"select","default":"qa","options":["dev"]
        }));
        assert!(matches!(
            render_field(&field).control,
            Control::Select { selected: 0, .. }
        ));
    }

    #[test]
    fn multiselect_ignores_default() {
        let field = descriptor(json!({
            "name":"tags","label":"Tags","type":"multiselect","default":["a"],
            "options":["a","b"]
        }));
        let Control::MultiSelect { options, hint } = render_field(&field).control else {
            panic!("expected multiselect");
        };
        assert_eq!(options.len(), 2);
        assert_eq!(hint, MULTISELECT_HINT);
    }

    #[test]
    fn missing_label_falls_back_to_name() {
        let field = descriptor(json!({"name":"path","type":"text"}));
        assert_eq!(render_field(&field).label, "path");
    }
}
