//! Extended JSON normalization
//!
//! Write payloads arrive as plain JSON but may carry MongoDB Extended JSON
//! sentinels for the types JSON cannot express. This module converts between
//! the two worlds:
//! - `normalize` rewrites `{"$oid": ...}` and `{"$date": ...}` sentinel maps
//!   into native BSON object ids and datetimes on the way in
//! - `to_wire` and `document_to_wire` project stored BSON back to wire-safe
//!   JSON on the way out, with `_id` always rendered as a string
//! - `id_filter` resolves a path identifier to an `_id` match, preferring the
//!   object-id interpretation and falling back to a literal string match
//!
//! Normalization is total: malformed sentinels degrade to passing the literal
//! value through rather than rejecting the write.

use bson::{doc, oid::ObjectId, Bson, Document};
use serde_json::Value;

// 0001-01-01T00:00:00Z and 9999-12-31T23:59:59.999Z in Unix milliseconds.
const MIN_TIMESTAMP_MS: i64 = -62_135_596_800_000;
const MAX_TIMESTAMP_MS: i64 = 253_402_300_799_999;

/// Recursively rewrite Extended JSON sentinels in `value` to native BSON.
///
/// A sentinel is only recognized when it is the sole key of its map:
/// `{"$oid": "...", "note": "..."}` is an ordinary map whose values are
/// normalized individually. Unparseable sentinel contents pass through as
/// their literal value; this function never fails.
pub fn normalize(value: Value) -> Bson {
    match value {
        Value::Object(map) => normalize_map(map),
        Value::Array(items) => Bson::Array(items.into_iter().map(normalize).collect()),
        Value::String(s) => Bson::String(s),
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => number_to_bson(n),
        Value::Null => Bson::Null,
    }
}

fn normalize_map(map: serde_json::Map<String, Value>) -> Bson {
    let is_sentinel_key = map.len() == 1
        && map
            .keys()
            .next()
            .is_some_and(|key| key == "$oid" || key == "$date");

    if is_sentinel_key {
        if let Some((key, inner)) = map.into_iter().next() {
            return if key == "$oid" {
                normalize_oid(inner)
            } else {
                normalize_date(inner)
            };
        }
        return Bson::Document(Document::new());
    }

    let mut document = Document::new();
    for (key, value) in map {
        document.insert(key, normalize(value));
    }
    Bson::Document(document)
}

/// `{"$oid": <string>}`: a valid 24-hex-character value becomes an ObjectId;
/// anything else keeps the literal string. A non-string `$oid` value is not
/// the sentinel shape and is rebuilt as an ordinary map.
fn normalize_oid(inner: Value) -> Bson {
    match inner {
        Value::String(hex) => match ObjectId::parse_str(&hex) {
            Ok(oid) => Bson::ObjectId(oid),
            Err(_) => Bson::String(hex),
        },
        other => {
            let mut document = Document::new();
            document.insert("$oid", normalize(other));
            Bson::Document(document)
        }
    }
}

/// `{"$date": ...}`: the wrapper map is always unwrapped. The inner value
/// becomes a datetime when it is a `{"$numberLong": <millis>}` map within the
/// representable range or a parseable ISO-8601 string; otherwise it passes
/// through untouched (no further sentinel interpretation).
fn normalize_date(inner: Value) -> Bson {
    match inner {
        Value::Object(map) if map.len() == 1 => {
            if let Some(Value::String(raw)) = map.get("$numberLong") {
                if let Ok(millis) = raw.parse::<i64>() {
                    return if (MIN_TIMESTAMP_MS..=MAX_TIMESTAMP_MS).contains(&millis) {
                        Bson::DateTime(bson::DateTime::from_millis(millis))
                    } else {
                        // Out-of-range instants keep the raw count as a number.
                        Bson::Int64(millis)
                    };
                }
            }
            json_to_bson(Value::Object(map))
        }
        Value::String(s) => match parse_iso_datetime(&s) {
            Some(datetime) => Bson::DateTime(datetime),
            None => Bson::String(s),
        },
        other => json_to_bson(other),
    }
}

/// Structural JSON-to-BSON conversion with no sentinel recognition. Used for
/// the inner value of an unclaimed `$date` wrapper and for update payloads,
/// which apply field values verbatim. Shares the number conventions of
/// [`normalize`].
pub fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Object(map) => {
            let mut document = Document::new();
            for (key, value) in map {
                document.insert(key, json_to_bson(value));
            }
            Bson::Document(document)
        }
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::String(s) => Bson::String(s),
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => number_to_bson(n),
        Value::Null => Bson::Null,
    }
}

fn number_to_bson(number: serde_json::Number) -> Bson {
    if let Some(int) = number.as_i64() {
        if let Ok(int32) = i32::try_from(int) {
            Bson::Int32(int32)
        } else {
            Bson::Int64(int)
        }
    } else if let Some(double) = number.as_f64() {
        Bson::Double(double)
    } else {
        Bson::String(number.to_string())
    }
}

/// Parse an ISO-8601 datetime. A trailing `Z` is the UTC offset; naive
/// datetime, space-separated, and date-only forms are treated as UTC.
/// Instants outside the representable year range (1 through 9999) are
/// rejected so callers fall back to the literal string.
fn parse_iso_datetime(text: &str) -> Option<bson::DateTime> {
    let parsed = if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(text) {
        Some(bson::DateTime::from_chrono(datetime))
    } else {
        const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
        NAIVE_FORMATS
            .iter()
            .find_map(|format| chrono::NaiveDateTime::parse_from_str(text, format).ok())
            .or_else(|| {
                chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
            .map(|naive| bson::DateTime::from_chrono(naive.and_utc()))
    };

    parsed.filter(|datetime| {
        (MIN_TIMESTAMP_MS..=MAX_TIMESTAMP_MS).contains(&datetime.timestamp_millis())
    })
}

/// Project a BSON value to wire-safe JSON: object ids become hex strings,
/// datetimes become RFC 3339 strings, numbers stay numbers. BSON types the
/// gateway never writes itself (binary, decimal128, ...) keep their relaxed
/// Extended JSON rendering.
pub fn to_wire(value: Bson) -> Value {
    match value {
        Bson::Document(document) => {
            let mut map = serde_json::Map::with_capacity(document.len());
            for (key, value) in document {
                map.insert(key, to_wire(value));
            }
            Value::Object(map)
        }
        Bson::Array(items) => Value::Array(items.into_iter().map(to_wire).collect()),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(datetime) => Value::String(datetime_to_string(datetime)),
        Bson::String(s) => Value::String(s),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::Null => Value::Null,
        other => other.into_relaxed_extjson(),
    }
}

/// Project a full document to wire JSON, forcing `_id` to its string form.
pub fn document_to_wire(document: Document) -> Value {
    let mut map = serde_json::Map::with_capacity(document.len());
    for (key, value) in document {
        if key == "_id" {
            map.insert(key, Value::String(id_to_string(&value)));
        } else {
            map.insert(key, to_wire(value));
        }
    }
    Value::Object(map)
}

/// String form of an `_id`: hex for object ids, verbatim for strings.
pub fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        Bson::DateTime(datetime) => datetime_to_string(*datetime),
        other => other.to_string(),
    }
}

fn datetime_to_string(datetime: bson::DateTime) -> String {
    datetime
        .try_to_rfc3339_string()
        .unwrap_or_else(|_| datetime.timestamp_millis().to_string())
}

/// Build the `_id` filter for a path identifier.
///
/// An identifier that parses as an ObjectId (exactly 24 hex characters) always
/// matches the object-id interpretation; anything else matches the literal
/// string. A document whose *string* `_id` happens to look like 24 hex
/// characters is therefore unreachable under that string value.
pub fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": oid },
        Err(_) => doc! { "_id": id },
    }
}
