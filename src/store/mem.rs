//! Reference in-memory [`KvStore`] backend: a sorted map keyed by the raw
//! string key. Not a persistence format -- a usage example and test
//! fixture for [`super::EventStore`].

use std::collections::BTreeMap;

use crate::error::Error;
use crate::kv::{KvStore, ListOptions};

#[derive(Debug, Clone, Default)]
pub struct MemKv {
    map: BTreeMap<String, Vec<u8>>,
}

impl MemKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.map.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        self.map.insert(key.to_string(), value);
        Ok(())
    }

    fn del(&mut self, key: &str) -> Result<(), Error> {
        self.map.remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str, options: ListOptions) -> Result<Vec<(String, Option<Vec<u8>>)>, Error> {
        let mut out = Vec::new();
        for (k, v) in self.map.range(prefix.to_string()..) {
            if !k.starts_with(prefix) {
                break;
            }
            if let Some(limit) = options.limit {
                if out.len() >= limit {
                    break;
                }
            }
            out.push((k.clone(), if options.keys_only { None } else { Some(v.clone()) }));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_respects_prefix_and_order() {
        let mut kv = MemKv::new();
        kv.put("kel/a/000000000000000000000000/S1", vec![1]).unwrap();
        kv.put("kel/a/000000000000000000000001/S2", vec![2]).unwrap();
        kv.put("kel/b/000000000000000000000000/S3", vec![3]).unwrap();
        let listed = kv.list("kel/a/", ListOptions::default()).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].0.ends_with("S1"));
        assert!(listed[1].0.ends_with("S2"));
    }

    #[test]
    fn limit_truncates_results() {
        let mut kv = MemKv::new();
        kv.put("a/1", vec![1]).unwrap();
        kv.put("a/2", vec![2]).unwrap();
        let listed = kv
            .list("a/", ListOptions { keys_only: false, limit: Some(1) })
            .unwrap();
        assert_eq!(listed.len(), 1);
    }
}
