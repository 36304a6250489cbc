//! Narrowing of the unpickled trailer into index records.
//!
//! The pickle decoder yields a closed [`Value`] tree. Only one shape is
//! accepted: `{path: [(offset, size, extra)]}`. Anything else fails here,
//! before a single entry is built.

use num_bigint::BigInt;
use serde_pickle::{HashableValue, Value};

use crate::{Error, Result};

/// One trailer record with offset and size de-obfuscated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrailerRecord {
    /// The raw key, before cleaning and stripping.
    pub path: String,
    pub offset: u64,
    pub size: u64,
}

/// Narrow the trailer root into records, XORing offsets and sizes with `key`.
pub(crate) fn narrow(root: Value, key: u64) -> Result<Vec<TrailerRecord>> {
    let map = match root {
        Value::Dict(map) => map,
        other => return Err(Error::TrailerNotMap(type_name(&other))),
    };

    map.into_iter()
        .map(|(k, v)| {
            let path = key_text(k)?;
            let (offset, size) = location(&path, v)?;
            Ok(TrailerRecord {
                path,
                offset: offset ^ key,
                size: size ^ key,
            })
        })
        .collect()
}

fn key_text(key: HashableValue) -> Result<String> {
    match key {
        HashableValue::String(s) => Ok(s),
        HashableValue::Bytes(b) => String::from_utf8(b).map_err(|e| Error::MalformedEntry {
            path: String::from_utf8_lossy(e.as_bytes()).into_owned(),
            reason: "path is not valid UTF-8".to_string(),
        }),
        other => Err(Error::MalformedEntry {
            path: format!("{other:?}"),
            reason: "expected a string key".to_string(),
        }),
    }
}

/// Unwrap `[(offset, size, extra)]` into the raw `(offset, size)` pair.
fn location(path: &str, value: Value) -> Result<(u64, u64)> {
    let malformed = |reason: String| Error::MalformedEntry {
        path: path.to_string(),
        reason,
    };

    let mut items = match value {
        Value::List(items) => items,
        other => return Err(malformed(format!("expected list, got {}", type_name(&other)))),
    };
    if items.len() != 1 {
        return Err(malformed(format!("expected 1 item in list, got {}", items.len())));
    }
    let tuple = match items.swap_remove(0) {
        Value::Tuple(tuple) => tuple,
        other => return Err(malformed(format!("expected tuple, got {}", type_name(&other)))),
    };
    if tuple.len() != 3 {
        return Err(malformed(format!("expected 3 items in tuple, got {}", tuple.len())));
    }

    let offset = integer(&tuple[0]).ok_or_else(|| malformed("offset is not a u64".to_string()))?;
    let size = integer(&tuple[1]).ok_or_else(|| malformed("size is not a u64".to_string()))?;
    Ok((offset, size))
}

fn integer(value: &Value) -> Option<u64> {
    match value {
        Value::I64(n) => u64::try_from(*n).ok(),
        Value::Int(n) => u64::try_from(n).ok(),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::None => "None",
        Value::Bool(_) => "bool",
        Value::I64(_) | Value::Int(_) => "int",
        Value::F64(_) => "float",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "str",
        Value::List(_) => "list",
        Value::Tuple(_) => "tuple",
        Value::Dict(_) => "dict",
        _ => "set",
    }
}

/// Wrap a raw `(offset, size)` pair the way the packer does.
#[cfg(test)]
pub(crate) fn record_value(offset: Value, size: Value) -> Value {
    Value::List(vec![Value::Tuple(vec![
        offset,
        size,
        Value::Bytes(Vec::new()),
    ])])
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn dict(entries: Vec<(HashableValue, Value)>) -> Value {
        Value::Dict(entries.into_iter().collect::<BTreeMap<_, _>>())
    }

    #[test]
    fn test_narrow_xors_offset_and_size() {
        let key = 0xDEAD_BEEF;
        let root = dict(vec![(
            HashableValue::String("game/sub/file.rpyc".into()),
            record_value(Value::I64(100 ^ key), Value::I64(20 ^ key)),
        )]);

        let records = narrow(root, key as u64).unwrap();
        assert_eq!(
            records,
            [TrailerRecord {
                path: "game/sub/file.rpyc".into(),
                offset: 100,
                size: 20,
            }]
        );
    }

    #[test]
    fn test_accepts_bigint_and_byte_keys() {
        let root = dict(vec![(
            HashableValue::Bytes(b"archive/a.png".to_vec()),
            record_value(Value::Int(BigInt::from(7u64)), Value::I64(3)),
        )]);
        let records = narrow(root, 0).unwrap();
        assert_eq!(records[0].path, "archive/a.png");
        assert_eq!((records[0].offset, records[0].size), (7, 3));
    }

    #[test]
    fn test_rejects_non_map_root() {
        let err = narrow(Value::List(vec![]), 0).unwrap_err();
        assert!(matches!(err, Error::TrailerNotMap("list")));
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        let two_tuple = Value::List(vec![Value::Tuple(vec![Value::I64(0), Value::I64(0)])]);
        let bare_tuple = Value::Tuple(vec![Value::I64(0), Value::I64(0), Value::None]);
        let two_items = Value::List(vec![
            record_value(Value::I64(0), Value::I64(0)),
            record_value(Value::I64(0), Value::I64(0)),
        ]);
        let text_offset = record_value(Value::String("0".into()), Value::I64(0));
        let negative = record_value(Value::I64(-1), Value::I64(0));
        let huge = record_value(Value::Int(BigInt::from(u64::MAX) + 1u32), Value::I64(0));

        for value in [two_tuple, bare_tuple, two_items, text_offset, negative, huge] {
            let root = dict(vec![(HashableValue::String("a/b".into()), value)]);
            let err = narrow(root, 0).unwrap_err();
            assert!(matches!(err, Error::MalformedEntry { .. }), "{err}");
        }
    }
}
