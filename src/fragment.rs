//! Session-parameter fragment encoding.
//!
//! Game servers hand clients a small set of session parameters (instance,
//! name, team, entry mode) that survive restarts. They are stored in a
//! compact `key=value,key=value,...` encoding: fields split on commas, each
//! field split on the first `=`, and a field with no `=` carries an empty
//! value. Serialization reproduces the exact same shape, omitting the `=`
//! entirely for empty values, so a parse/serialize round trip is lossless.

/// An ordered list of key/value pairs in fragment encoding.
///
/// Order is preserved across parse, update, and serialize so that fields a
/// user (or another tool) wrote stay where they were.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pairs: Vec<(String, String)>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a fragment string. An empty input yields an empty fragment.
    pub fn parse(s: &str) -> Self {
        let mut pairs = Vec::new();
        if s.is_empty() {
            return Self { pairs };
        }

        for field in s.split(',') {
            match field.split_once('=') {
                Some((key, val)) => pairs.push((key.to_string(), val.to_string())),
                None => pairs.push((field.to_string(), String::new())),
            }
        }

        Self { pairs }
    }

    /// Look up the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key` to `val`, updating in place or appending at the end.
    pub fn set(&mut self, key: &str, val: &str) {
        for (k, v) in &mut self.pairs {
            if k == key {
                *v = val.to_string();
                return;
            }
        }
        self.pairs.push((key.to_string(), val.to_string()));
    }

    /// Serialize back to `key=value,...`, with `=` omitted for empty values.
    pub fn encode(&self) -> String {
        let mut s = String::new();
        for (i, (key, val)) in self.pairs.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            s.push_str(key);
            if !val.is_empty() {
                s.push('=');
                s.push_str(val);
            }
        }
        s
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}
