//! Persisted incremental fetch anchors, one per domain.

use crate::domain_key;
use crate::error::StorageResult;
use crate::kv::KvStore;
use std::collections::HashMap;
use tracing::debug;
use vitalsync_types::{Anchor, Domain};

const ANCHOR_KEY: &str = "anchor";

/// Anchors of every domain.
#[derive(Debug, Clone)]
pub struct AnchorStore {
    kv: KvStore,
    anchors: HashMap<Domain, Anchor>,
}

impl AnchorStore {
    pub fn load(kv: KvStore) -> StorageResult<Self> {
        let mut anchors = HashMap::new();
        for domain in Domain::ALL {
            if let Some(anchor) = kv.get_json::<Anchor>(&domain_key(domain, ANCHOR_KEY))? {
                anchors.insert(domain, anchor);
            }
        }
        Ok(Self { kv, anchors })
    }

    /// The stored anchor, or `None` when the next fetch must be a full one.
    pub fn get(&self, domain: Domain) -> Option<&Anchor> {
        self.anchors.get(&domain)
    }

    pub fn save(&mut self, domain: Domain, anchor: Anchor) -> StorageResult<()> {
        self.kv.put_json(&domain_key(domain, ANCHOR_KEY), &anchor)?;
        debug!("Saved {} anchor {}", domain, anchor.as_str());
        self.anchors.insert(domain, anchor);
        Ok(())
    }

    /// Forgets the domain's anchor so the next fetch returns everything.
    pub fn reset(&mut self, domain: Domain) -> StorageResult<()> {
        self.kv.delete(&domain_key(domain, ANCHOR_KEY))?;
        self.anchors.remove(&domain);
        debug!("Reset {} anchor", domain);
        Ok(())
    }
}
