use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use compio::{fs::File, io::AsyncReadExt, io::BufReader};
use hashlink::LinkedHashMap;
use saphyr::{Scalar, Yaml};
use tracing::debug;

/// Reads a whole document into memory.
pub async fn read_document(path: &Path) -> std::io::Result<String> {
    debug!("Opening {}", path.display());
    let file = File::open(path).await?;
    let cursor = Cursor::new(file);
    let mut reader = BufReader::new(cursor);
    let res = reader.read_to_string(String::new()).await;
    let n = res.0?;
    debug!("Read {} bytes from {}", n, path.display());
    Ok(res.1)
}

pub fn key(name: &'static str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

pub fn get<'a, 'input>(
    map: &'a LinkedHashMap<Yaml<'input>, Yaml<'input>>,
    name: &'static str,
) -> Option<&'a Yaml<'input>> {
    map.get(&key(name))
}

/// Renders a scalar as a string; `None` for null values and collections.
pub fn scalar_string(value: &Yaml) -> Option<String> {
    match value {
        Yaml::Value(Scalar::String(s)) => Some(s.to_string()),
        Yaml::Value(Scalar::Integer(i)) => Some(i.to_string()),
        Yaml::Value(Scalar::Boolean(b)) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads a string-to-string map, `None` when `value` is not a mapping.
pub fn string_map(value: &Yaml) -> Option<BTreeMap<String, String>> {
    value.as_mapping().map(|mapping| {
        mapping
            .iter()
            .filter_map(|(k, v)| Some((scalar_string(k)?, scalar_string(v)?)))
            .collect()
    })
}
