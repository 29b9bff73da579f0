//! JSON Export

use std::collections::BTreeMap;
use std::io::Write;

use crate::error::Result;
use crate::storage::{Entry, Store};

impl Store {
    /// Pretty-printed JSON object keyed by entry key
    pub fn to_json(&self) -> Result<String> {
        let entries: BTreeMap<String, Entry> = self.sorted_entries().into_iter().collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    pub fn export_json<W: Write>(&self, mut writer: W) -> Result<()> {
        let entries: BTreeMap<String, Entry> = self.sorted_entries().into_iter().collect();
        serde_json::to_writer_pretty(&mut writer, &entries)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::VacuumConfig;
    use crate::storage::Store;
    use serde_json::{json, Value};

    #[test]
    fn test_json_shape() {
        let store = Store::with_config(VacuumConfig::disabled());
        store.put("key", "value");
        store.put("Hack", "the Planet");
        store.put_ttl(
            "session",
            "abc",
            chrono::DateTime::from_timestamp(1_900_000_000, 0).unwrap(),
        );

        let parsed: Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();
        assert_eq!(
            parsed,
            json!({
                "Hack": { "value": "the Planet", "expires_at": null },
                "key": { "value": "value", "expires_at": null },
                "session": { "value": "abc", "expires_at": 1_900_000_000i64 },
            })
        );
    }

    #[test]
    fn test_json_sorted_and_writer_matches() {
        let store = Store::with_config(VacuumConfig::disabled());
        for (k, v) in [("4", "444"), ("1", "111"), ("3", "333"), ("2", "222")] {
            store.put(k, v);
        }

        let text = store.to_json().unwrap();
        let positions: Vec<usize> = ["\"1\"", "\"2\"", "\"3\"", "\"4\""]
            .iter()
            .map(|k| text.find(k).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let mut buf = Vec::new();
        store.export_json(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), text);
    }

    #[test]
    fn test_json_empty_store() {
        let store = Store::with_config(VacuumConfig::disabled());
        assert_eq!(store.to_json().unwrap(), "{}");
    }
}
