//! Casting tussen GEXF-tekstwaarden en native [`AttrValue`]s. Dit is de
//! enige plek waar type-informatie het typesysteem binnenkomt of
//! verlaat: het document slaat alles als tekst op.

use crate::graph::value::AttrValue;
use crate::model::PrimitiveType;

/// Cast een tekstwaarde naar het gedeclareerde type.
///
/// Deze richting faalt nooit. Een boolean is alleen `true` bij exact de
/// tekst `"true"`. Een mislukte numerieke parse levert een
/// NaN-sentinel op in plaats van een fout; wie de waarde consumeert
/// moet daar tegen kunnen.
#[must_use]
pub fn cast_from_text(ty: PrimitiveType, text: &str) -> AttrValue {
    match ty {
        PrimitiveType::Boolean => AttrValue::Boolean(text == "true"),
        PrimitiveType::Integer => text
            .parse::<i32>()
            .map(AttrValue::Integer)
            .unwrap_or_else(|_| AttrValue::Double(text.parse().unwrap_or(f64::NAN))),
        PrimitiveType::Long => text
            .parse::<i64>()
            .map(AttrValue::Long)
            .unwrap_or_else(|_| AttrValue::Double(text.parse().unwrap_or(f64::NAN))),
        PrimitiveType::Float => AttrValue::Float(text.parse().unwrap_or(f32::NAN)),
        PrimitiveType::Double => AttrValue::Double(text.parse().unwrap_or(f64::NAN)),
        PrimitiveType::ListString => {
            if text.is_empty() {
                AttrValue::List(Vec::new())
            } else {
                AttrValue::List(text.split('|').map(str::to_owned).collect())
            }
        }
        PrimitiveType::String | PrimitiveType::AnyUri => AttrValue::Text(text.to_owned()),
    }
}

/// Cast een native waarde terug naar documenttekst.
#[must_use]
pub fn cast_to_text(value: &AttrValue) -> String {
    match value {
        AttrValue::Text(text) => text.clone(),
        AttrValue::Integer(value) => value.to_string(),
        AttrValue::Long(value) => value.to_string(),
        AttrValue::Float(value) => value.to_string(),
        AttrValue::Double(value) => value.to_string(),
        AttrValue::Boolean(value) => value.to_string(),
        AttrValue::List(items) => items.join("|"),
    }
}

#[cfg(test)]
mod tests {
    use super::{cast_from_text, cast_to_text};
    use crate::graph::value::AttrValue;
    use crate::model::PrimitiveType;

    #[test]
    fn boolean_cast_is_total() {
        assert_eq!(
            cast_from_text(PrimitiveType::Boolean, "true"),
            AttrValue::Boolean(true)
        );
        for text in ["false", "True", "TRUE", "1", "yes", ""] {
            assert_eq!(
                cast_from_text(PrimitiveType::Boolean, text),
                AttrValue::Boolean(false),
                "`{text}` mag geen true opleveren"
            );
        }
    }

    #[test]
    fn numeric_casts_parse_text() {
        assert_eq!(
            cast_from_text(PrimitiveType::Integer, "22"),
            AttrValue::Integer(22)
        );
        assert_eq!(
            cast_from_text(PrimitiveType::Long, "3000000000"),
            AttrValue::Long(3_000_000_000)
        );
        assert_eq!(
            cast_from_text(PrimitiveType::Float, "2"),
            AttrValue::Float(2.0)
        );
        assert_eq!(
            cast_from_text(PrimitiveType::Double, "0.5"),
            AttrValue::Double(0.5)
        );
    }

    #[test]
    fn failed_numeric_parse_yields_nan_sentinel() {
        let value = cast_from_text(PrimitiveType::Integer, "geen getal");
        assert!(matches!(value, AttrValue::Double(v) if v.is_nan()));

        let value = cast_from_text(PrimitiveType::Double, "xyz");
        assert!(matches!(value, AttrValue::Double(v) if v.is_nan()));
    }

    #[test]
    fn non_integral_text_under_integer_type_stays_numeric() {
        assert_eq!(
            cast_from_text(PrimitiveType::Integer, "2.5"),
            AttrValue::Double(2.5)
        );
    }

    #[test]
    fn liststring_splits_on_pipe() {
        assert_eq!(
            cast_from_text(PrimitiveType::ListString, "cooking|money"),
            AttrValue::List(vec!["cooking".to_owned(), "money".to_owned()])
        );
        assert_eq!(
            cast_from_text(PrimitiveType::ListString, ""),
            AttrValue::List(Vec::new())
        );
    }

    #[test]
    fn liststring_roundtrips() {
        let items = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        let text = cast_to_text(&AttrValue::List(items.clone()));
        assert_eq!(text, "a|b|c");
        assert_eq!(
            cast_from_text(PrimitiveType::ListString, &text),
            AttrValue::List(items)
        );

        // lege lijst: lege tekst en weer terug
        let text = cast_to_text(&AttrValue::List(Vec::new()));
        assert_eq!(text, "");
        assert_eq!(
            cast_from_text(PrimitiveType::ListString, &text),
            AttrValue::List(Vec::new())
        );
    }

    #[test]
    fn to_text_uses_canonical_forms() {
        assert_eq!(cast_to_text(&AttrValue::Integer(22)), "22");
        assert_eq!(cast_to_text(&AttrValue::Boolean(false)), "false");
        assert_eq!(cast_to_text(&AttrValue::Float(2.0)), "2");
        assert_eq!(cast_to_text(&AttrValue::from("url")), "url");
    }
}
