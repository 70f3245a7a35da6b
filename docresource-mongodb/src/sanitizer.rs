//! Field name sanitization for MongoDB compatibility.
//!
//! MongoDB reserves dots and dollar signs in field names for query syntax and rejects
//! null bytes. Keys containing them are escaped on the way in and restored on the way
//! out. Values are stored untouched.

use bson::{Bson, Document};

pub(crate) struct KeySanitizer;

impl KeySanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Escapes the reserved characters of every key, recursively.
    pub(crate) fn sanitize_document(document: &Document) -> Document {
        document
            .iter()
            .map(|(k, v)| (Self::sanitize_key(k), Self::map_keys(v, Self::sanitize_document)))
            .collect()
    }

    /// Inverse of [`KeySanitizer::sanitize_document`].
    pub(crate) fn restore_document(document: &Document) -> Document {
        document
            .iter()
            .map(|(k, v)| (Self::restore_key(k), Self::map_keys(v, Self::restore_document)))
            .collect()
    }

    pub(crate) fn sanitize_key(input: &str) -> String {
        let mut sanitized = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            sanitized = sanitized.replace(*target, replacement);
        }
        sanitized
    }

    pub(crate) fn restore_key(input: &str) -> String {
        let mut restored = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(*replacement, target);
        }
        restored
    }

    fn map_keys(value: &Bson, on_document: fn(&Document) -> Document) -> Bson {
        match value {
            Bson::Document(doc) => Bson::Document(on_document(doc)),
            Bson::Array(arr) => Bson::Array(
                arr.iter()
                    .map(|item| Self::map_keys(item, on_document))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn keys_are_escaped_and_values_left_alone() {
        let document = doc! {
            "a.b": "x.y",
            "$price": { "in.ner": 1 },
            "list": [{ "k.k": "$v" }],
        };

        let sanitized = KeySanitizer::sanitize_document(&document);

        assert_eq!(
            sanitized,
            doc! {
                "a__dot__b": "x.y",
                "__dollar__price": { "in__dot__ner": 1 },
                "list": [{ "k__dot__k": "$v" }],
            }
        );
        assert_eq!(KeySanitizer::restore_document(&sanitized), document);
    }

    #[test]
    fn plain_keys_are_unchanged() {
        assert_eq!(KeySanitizer::sanitize_key("username"), "username");
        assert_eq!(KeySanitizer::sanitize_key("_id"), "_id");
    }
}
