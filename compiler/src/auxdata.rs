// auxdata.rs — Flattened aux metadata blobs for runtime introspection
//
// Each compound type is described by a list of `key=value` entries which the
// generated code embeds as a chain of NUL-terminated C string literals.
// Fields nest under a `<field>.` key prefix.

use crate::id::TypeId;
use crate::model::{AuxData, TypeKind, TypeModel};
use crate::quote::backslash_quote;

/// Entries describing a whole type.
pub fn type_entries(model: &TypeModel, ty: TypeId) -> Vec<String> {
    let node = model.get(ty);
    let mut out = Vec::new();
    if node.storage().is_compound() {
        out.push(format!("typename={}", model.type_identifier(ty)));
        out.push(format!("type={}", node.storage().name()));
    }
    match &node.kind {
        TypeKind::Sequence { element } => out.push(format!("fields={}", element.name)),
        TypeKind::Record { fields } => {
            let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            out.push(format!("fields={}", names.join(";")));
        }
        TypeKind::Enum { values, .. } => {
            let names: Vec<&str> = values.iter().map(|v| v.ident.as_str()).collect();
            out.push(format!("enumerators={}", names.join(";")));
        }
        _ => {}
    }
    push_aux(&mut out, "", &node.aux_data);
    match &node.kind {
        TypeKind::Enum { values, .. } => {
            for v in values {
                out.push(format!("{}.value={}", v.ident, v.value));
                if let Some(label) = v.label.as_deref().filter(|l| !l.is_empty()) {
                    out.push(format!("{}.label={}", v.ident, label));
                }
                if let Some(blurb) = v.blurb.as_deref().filter(|b| !b.is_empty()) {
                    out.push(format!("{}.blurb={}", v.ident, blurb));
                }
            }
        }
        TypeKind::Sequence { element } => {
            let prefix = format!("{}.", element.name);
            out.extend(field_entries(model, element.ty, &element.aux_data, &prefix));
        }
        TypeKind::Record { fields } | TypeKind::Interface { fields, .. } => {
            for f in fields {
                let prefix = format!("{}.", f.name);
                out.extend(field_entries(model, f.ty, &f.aux_data, &prefix));
            }
        }
        _ => {}
    }
    out
}

/// Entries describing one field of type `ty` under `prefix`.
pub fn field_entries(model: &TypeModel, ty: TypeId, aux: &AuxData, prefix: &str) -> Vec<String> {
    let mut out = vec![format!("{}type={}", prefix, model.type_identifier(ty))];
    push_aux(&mut out, prefix, aux);
    out
}

fn push_aux(out: &mut Vec<String>, prefix: &str, aux: &AuxData) {
    for (key, value) in aux.iter() {
        if !value.is_empty() {
            out.push(format!("{}{}={}", prefix, key, value));
        }
    }
}

/// Render entries as one C string literal per line, each NUL-terminated.
/// An empty list renders as a single empty literal.
pub fn render_block(entries: &[String], indent: &str) -> String {
    if entries.is_empty() {
        return format!("{}\"\"\n", indent);
    }
    let mut s = String::new();
    for e in entries {
        s.push_str(&format!("{}\"{}\\0\"\n", indent, backslash_quote(e)));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EnumValue, Field, StorageKind, TypeNode};
    use crate::schema::aux_value_string;
    use serde_json::json;

    #[test]
    fn record_entries_nest_fields() {
        let mut model = TypeModel::new();
        let ns = model.intern_namespace(&["Bse"]);
        let int = TypeModel::primitive(StorageKind::Int32).unwrap();
        let mut x = Field::new("x", int);
        x.aux_data.insert("label", "X Coordinate");
        x.aux_data.insert("hints", "");
        let rec = model.add_type(
            TypeNode::new(
                "Point",
                ns,
                TypeKind::Record {
                    fields: vec![x, Field::new("y", int)],
                },
            )
            .with_aux("blurb", "A point"),
        );
        assert_eq!(
            type_entries(&model, rec),
            vec![
                "typename=Bse.Point",
                "type=RECORD",
                "fields=x;y",
                "blurb=A point",
                "x.type=INT32",
                "x.label=X Coordinate",
                "y.type=INT32",
            ]
        );
    }

    #[test]
    fn enum_entries_list_values() {
        let mut model = TypeModel::new();
        let e = model.add_type(TypeNode::new(
            "Mode",
            vec![],
            TypeKind::Enum {
                values: vec![
                    EnumValue {
                        ident: "OFF".into(),
                        label: Some("Off".into()),
                        blurb: None,
                        value: 0,
                    },
                    EnumValue {
                        ident: "ON".into(),
                        label: None,
                        blurb: Some("Switched on".into()),
                        value: 1,
                    },
                ],
                combinable: false,
            },
        ));
        assert_eq!(
            type_entries(&model, e),
            vec![
                "typename=Mode",
                "type=ENUM",
                "enumerators=OFF;ON",
                "OFF.value=0",
                "OFF.label=Off",
                "ON.value=1",
                "ON.blurb=Switched on",
            ]
        );
    }

    #[test]
    fn sequence_entries_use_element_name() {
        let mut model = TypeModel::new();
        let string = TypeModel::primitive(StorageKind::String).unwrap();
        let seq = model.add_type(TypeNode::new(
            "StringSeq",
            vec![],
            TypeKind::Sequence {
                element: Field::new("strings", string),
            },
        ));
        assert_eq!(
            type_entries(&model, seq),
            vec![
                "typename=StringSeq",
                "type=SEQUENCE",
                "fields=strings",
                "strings.type=STRING",
            ]
        );
    }

    #[test]
    fn block_rendering_escapes_values() {
        let entries = vec!["blurb=say \"hi\"".to_string(), "type=ENUM".to_string()];
        assert_eq!(
            render_block(&entries, "  "),
            "  \"blurb=say \\\"hi\\\"\\0\"\n  \"type=ENUM\\0\"\n"
        );
        assert_eq!(render_block(&[], "  "), "  \"\"\n");
    }

    #[test]
    fn block_rendering_keeps_control_characters_inside_literals() {
        let blurb = aux_value_string(&json!("two\nlines\tand a\u{1}bell"));
        let out = render_block(&[format!("blurb={}", blurb)], "  ");
        assert_eq!(out, "  \"blurb=two\\nlines\\tand a\\001bell\\0\"\n");
        assert_eq!(out.trim_end().lines().count(), 1);

        // Escape sequences written in a literal chain survive as escapes.
        let chained = aux_value_string(&json!(r#"_("first\n" "second")"#));
        assert_eq!(chained, "first\nsecond");
        assert_eq!(
            render_block(&[format!("blurb={}", chained)], ""),
            "\"blurb=first\\nsecond\\0\"\n"
        );
    }
}
