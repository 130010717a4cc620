//! Field interpolation for tooltip html.
//!
//! Placeholders take the form `{{field}}`. Each scalar field of the datum
//! (string, number or boolean) replaces every placeholder with its name.
//! Placeholders naming missing or non-scalar fields are left in place.

use serde_json::Value;

/// Substitute the datum's scalar fields into `html`.
#[must_use]
pub fn parse_fields(datum: &Value, html: &str) -> String {
    let Some(fields) = datum.as_object() else {
        return html.to_string();
    };
    let mut out = html.to_string();
    for (name, value) in fields {
        if let Some(text) = scalar_text(value) {
            out = out.replace(&format!("{{{{{name}}}}}"), &text);
        }
    }
    out
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => match n.as_f64() {
            // Integral floats print without a trailing ".0".
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substitutes_scalars() {
        let datum = json!({"id": "rs123", "position": 1_234_567, "pvalue": 0.05, "ld": true});
        let html = "<b>{{id}}</b> at {{position}} p={{pvalue}} ld={{ld}} {{id}}";
        assert_eq!(
            parse_fields(&datum, html),
            "<b>rs123</b> at 1234567 p=0.05 ld=true rs123"
        );
    }

    #[test]
    fn test_leaves_unknown_placeholders() {
        let datum = json!({"id": "rs1", "nested": {"a": 1}, "list": [1]});
        assert_eq!(
            parse_fields(&datum, "{{id}} {{nested}} {{list}} {{missing}}"),
            "rs1 {{nested}} {{list}} {{missing}}"
        );
    }

    #[test]
    fn test_integral_float_prints_as_integer() {
        assert_eq!(parse_fields(&json!({"v": 10.0}), "{{v}}"), "10");
    }

    #[test]
    fn test_non_object_datum() {
        assert_eq!(parse_fields(&json!(5), "{{v}}"), "{{v}}");
    }
}
