//! SAID-indexed event store with secondary indices for KEL/TEL sequence,
//! prior-SAID reverse lookup, and alias scopes (spec §4.7). Built
//! generically over any [`KvStore`](crate::kv::KvStore) backend; the
//! store never parses event semantics beyond what it records in
//! [`EventMeta`].

pub mod mem;

use serde::{Deserialize, Serialize};

use crate::acdc::{Acdc, Schema};
use crate::error::Error;
use crate::event::event_data::EventData;
use crate::event::KeyEvent;
use crate::kv::{KvStore, ListOptions};
use crate::prefix::{IdentifierPrefix, Prefix, SelfAddressingPrefix};
use crate::tel::TelEvent;

/// Which wire encoding a stored event's raw bytes are in (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CesrEncoding {
    Binary,
    Text,
}

/// The alias namespace an alias mapping belongs to (spec §3: "each scope
/// has an independent namespace").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasScope {
    Kel,
    Tel,
    Schema,
    Acdc,
}

impl AliasScope {
    fn segment(self) -> &'static str {
        match self {
            AliasScope::Kel => "kel",
            AliasScope::Tel => "tel",
            AliasScope::Schema => "schema",
            AliasScope::Acdc => "acdc",
        }
    }
}

/// Canonical metadata the store records for every event, regardless of
/// type (spec §4.7: "the store never parses event semantics beyond what
/// the canonical metadata records").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    pub event_type: String,
    pub said: String,
    pub scope: Option<String>,
    pub sn: Option<u64>,
    pub prior: Option<String>,
    pub timestamp: Option<String>,
    pub acdc: Option<String>,
    pub issuer: Option<String>,
    pub holder: Option<String>,
    pub registry: Option<String>,
}

fn zero_pad(sn: u64) -> String {
    format!("{sn:020}")
}

fn event_key(said: &str) -> String {
    format!("event/{said}")
}

fn meta_key(said: &str) -> String {
    format!("meta/{said}")
}

fn kel_key(aid: &str, sn: u64, said: &str) -> String {
    format!("kel/{aid}/{}/{said}", zero_pad(sn))
}

fn kel_prefix(aid: &str) -> String {
    format!("kel/{aid}/")
}

fn tel_key(ri: &str, sn: u64, said: &str) -> String {
    format!("tel/{ri}/{}/{said}", zero_pad(sn))
}

fn tel_prefix(ri: &str) -> String {
    format!("tel/{ri}/")
}

fn prior_key(prior_said: &str, said: &str) -> String {
    format!("prior/{prior_said}/{said}")
}

fn prior_prefix(prior_said: &str) -> String {
    format!("prior/{prior_said}/")
}

fn alias_said_key(scope: AliasScope, alias: &str) -> String {
    format!("alias/{}/{alias}", scope.segment())
}

fn alias_scope_prefix(scope: AliasScope) -> String {
    format!("alias/{}/", scope.segment())
}

fn kel_head_key(aid: &str) -> String {
    format!("head/kel/{aid}")
}

fn tel_head_key(ri: &str) -> String {
    format!("head/tel/{ri}")
}

/// Returns the `p` (prior event SAID) a KEL event body carries, or
/// `None` for inception events which have none.
fn kel_prior(data: &EventData) -> Option<&SelfAddressingPrefix> {
    match data {
        EventData::Icp(_) | EventData::Dip(_) => None,
        EventData::Rot(d) | EventData::Drt(d) => Some(&d.previous_event_said),
        EventData::Ixn(d) => Some(&d.previous_event_said),
    }
}

/// The SAID-indexed event store (spec §4.7). Generic over any
/// [`KvStore`] backend.
pub struct EventStore<KV: KvStore> {
    kv: KV,
}

impl<KV: KvStore> EventStore<KV> {
    pub fn new(kv: KV) -> Self {
        Self { kv }
    }

    pub fn into_inner(self) -> KV {
        self.kv
    }

    fn store_raw_and_meta(&mut self, said: &str, raw: &[u8], meta: &EventMeta) -> Result<(), Error> {
        if self.kv.get(&event_key(said))?.is_some() {
            return Err(Error::DuplicateEvent(said.to_string()));
        }
        let meta_bytes =
            serde_json::to_vec(meta).map_err(|e| Error::Internal(format!("meta serialize failed: {e}")))?;
        self.kv.put(&event_key(said), raw.to_vec())?;
        self.kv.put(&meta_key(said), meta_bytes)?;
        if let Some(ref prior) = meta.prior {
            self.kv.put(&prior_key(prior, said), Vec::new())?;
        }
        Ok(())
    }

    /// Raw content-addressed ingestion: stores `raw` keyed by `said`
    /// without any sequence validation (spec §4.7 `put_event`).
    pub fn put_event(
        &mut self,
        raw: Vec<u8>,
        said: SelfAddressingPrefix,
        event_type: &str,
        _encoding: CesrEncoding,
    ) -> Result<(String, EventMeta), Error> {
        let said_str = said.to_str();
        let meta = EventMeta {
            event_type: event_type.to_string(),
            said: said_str.clone(),
            scope: None,
            sn: None,
            prior: None,
            timestamp: None,
            acdc: None,
            issuer: None,
            holder: None,
            registry: None,
        };
        self.store_raw_and_meta(&said_str, &raw, &meta)?;
        Ok((said_str, meta))
    }

    pub fn get_event(&self, said: &str) -> Result<Option<(Vec<u8>, EventMeta)>, Error> {
        let raw = match self.kv.get(&event_key(said))? {
            Some(r) => r,
            None => return Ok(None),
        };
        let meta_bytes = self
            .kv
            .get(&meta_key(said))?
            .ok_or_else(|| Error::Internal(format!("event {said} has no metadata")))?;
        let meta: EventMeta =
            serde_json::from_slice(&meta_bytes).map_err(|e| Error::Internal(format!("bad stored metadata: {e}")))?;
        Ok(Some((raw, meta)))
    }

    /// Stores a KEL event, enforcing gap-free sequencing against the
    /// current head (spec §4.7 `put_kel_event`, §5 ordering guarantees).
    pub fn put_kel_event(&mut self, event: &KeyEvent) -> Result<(String, EventMeta), Error> {
        let aid = event.prefix.to_str();
        let said = event.said.to_str();
        let head = self.get_kel_head(&aid)?;
        let is_inception = matches!(event.data, EventData::Icp(_) | EventData::Dip(_));
        match (is_inception, &head) {
            (true, None) => {
                if event.sn != 0 {
                    return Err(Error::SequenceGap { expected: 0, got: event.sn });
                }
            }
            (true, Some(_)) => return Err(Error::DuplicateEvent(format!("kel {aid} already inaugurated"))),
            (false, None) => return Err(Error::SequenceGap { expected: 0, got: event.sn }),
            (false, Some(head_said)) => {
                let (_, head_meta) = self
                    .get_event(head_said)?
                    .ok_or_else(|| Error::Internal("kel head points at missing event".into()))?;
                let expected_sn = head_meta.sn.unwrap_or(0) + 1;
                if event.sn != expected_sn {
                    return Err(Error::SequenceGap {
                        expected: expected_sn,
                        got: event.sn,
                    });
                }
                if let Some(prior) = kel_prior(&event.data) {
                    if prior.to_str() != *head_said {
                        return Err(Error::PriorMismatch {
                            expected: head_said.clone(),
                            got: prior.to_str(),
                        });
                    }
                }
            }
        }

        let raw = serde_json::to_vec(event).map_err(|e| Error::Internal(format!("event serialize failed: {e}")))?;
        let meta = EventMeta {
            event_type: event.event_type().as_str().to_string(),
            said: said.clone(),
            scope: Some(aid.clone()),
            sn: Some(event.sn),
            prior: kel_prior(&event.data).map(|p| p.to_str()),
            timestamp: None,
            acdc: None,
            issuer: None,
            holder: None,
            registry: None,
        };
        self.store_raw_and_meta(&said, &raw, &meta)?;
        self.kv.put(&kel_key(&aid, event.sn, &said), Vec::new())?;
        self.set_kel_head(&aid, &said)?;
        log::debug!("kel {aid} admitted {} at sn {}", event.event_type().as_str(), event.sn);
        Ok((said, meta))
    }

    pub fn list_kel(&self, aid: &str, from: Option<u64>, to: Option<u64>) -> Result<Vec<(Vec<u8>, EventMeta)>, Error> {
        let entries = self.kv.list(&kel_prefix(aid), ListOptions::default())?;
        let mut out = Vec::new();
        for (key, _) in entries {
            let said = key.rsplit('/').next().unwrap_or_default();
            let (raw, meta) = self
                .get_event(said)?
                .ok_or_else(|| Error::Internal(format!("kel index points at missing event {said}")))?;
            let sn = meta.sn.unwrap_or(0);
            if from.map_or(false, |f| sn < f) || to.map_or(false, |t| sn > t) {
                continue;
            }
            out.push((raw, meta));
        }
        Ok(out)
    }

    pub fn get_kel_head(&self, aid: &str) -> Result<Option<String>, Error> {
        self.kv
            .get(&kel_head_key(aid))?
            .map(|b| String::from_utf8(b).map_err(|e| Error::Internal(format!("bad head bytes: {e}"))))
            .transpose()
    }

    pub fn set_kel_head(&mut self, aid: &str, said: &str) -> Result<(), Error> {
        self.kv.put(&kel_head_key(aid), said.as_bytes().to_vec())
    }

    /// Stores a TEL event under its registry scope (spec §4.7
    /// `put_tel_event`); validates sequencing the same way `put_kel_event`
    /// does, scoped to the registry rather than the AID.
    pub fn put_tel_event(&mut self, event: &TelEvent) -> Result<(String, EventMeta), Error> {
        let scope = event
            .registry_scope()
            .ok_or_else(|| Error::InvalidInput("tel event has no registry scope".into()))?
            .to_str();
        let said = event.said().to_str();
        let sn = event.sn();

        if matches!(event, TelEvent::Vcp(_)) {
            if self.get_tel_head(&scope)?.is_some() {
                return Err(Error::DuplicateEvent(format!("tel {scope} already has a vcp")));
            }
        }

        let raw = serde_json::to_vec(event).map_err(|e| Error::Internal(format!("tel event serialize failed: {e}")))?;
        let (acdc_ref, registry_ref) = match event {
            TelEvent::Iss(e) => (Some(e.credential_said.to_str()), Some(e.registry_id.to_str())),
            TelEvent::Rev(e) => (Some(e.credential_said.to_str()), Some(e.registry_id.to_str())),
            _ => (None, None),
        };
        let prior = match event {
            TelEvent::Rev(e) => Some(e.previous_event_said.to_str()),
            TelEvent::Ixn(e) => Some(e.previous_event_said.to_str()),
            TelEvent::Vrt(e) => Some(e.previous_event_said.to_str()),
            TelEvent::Vcp(_) | TelEvent::Iss(_) => None,
        };
        let meta = EventMeta {
            event_type: event.tag().to_string(),
            said: said.clone(),
            scope: Some(scope.clone()),
            sn: Some(sn),
            prior,
            timestamp: None,
            acdc: acdc_ref,
            issuer: None,
            holder: None,
            registry: registry_ref,
        };
        self.store_raw_and_meta(&said, &raw, &meta)?;
        // iss/rev key their own credential sub-sequence under the
        // registry's tel/ namespace too, distinguished by the credential
        // said occupying the aid-like slot so list_tel callers filtering
        // by registry still see the full picture via get_by_prior/meta.
        let scope_for_index = match event {
            TelEvent::Iss(_) | TelEvent::Rev(_) => event.said().to_str(),
            _ => scope.clone(),
        };
        self.kv.put(&tel_key(&scope_for_index, sn, &said), Vec::new())?;
        if !matches!(event, TelEvent::Iss(_) | TelEvent::Rev(_)) {
            self.set_tel_head(&scope, &said)?;
        }
        log::debug!("tel {scope} admitted {} at sn {sn}", event.tag());
        Ok((said, meta))
    }

    pub fn list_tel(&self, ri: &str, from: Option<u64>, to: Option<u64>) -> Result<Vec<(Vec<u8>, EventMeta)>, Error> {
        let entries = self.kv.list(&tel_prefix(ri), ListOptions::default())?;
        let mut out = Vec::new();
        for (key, _) in entries {
            let said = key.rsplit('/').next().unwrap_or_default();
            let (raw, meta) = self
                .get_event(said)?
                .ok_or_else(|| Error::Internal(format!("tel index points at missing event {said}")))?;
            let sn = meta.sn.unwrap_or(0);
            if from.map_or(false, |f| sn < f) || to.map_or(false, |t| sn > t) {
                continue;
            }
            out.push((raw, meta));
        }
        Ok(out)
    }

    pub fn get_tel_head(&self, ri: &str) -> Result<Option<String>, Error> {
        self.kv
            .get(&tel_head_key(ri))?
            .map(|b| String::from_utf8(b).map_err(|e| Error::Internal(format!("bad head bytes: {e}"))))
            .transpose()
    }

    pub fn set_tel_head(&mut self, ri: &str, said: &str) -> Result<(), Error> {
        self.kv.put(&tel_head_key(ri), said.as_bytes().to_vec())
    }

    pub fn put_acdc(&mut self, acdc: &Acdc) -> Result<(), Error> {
        let said = acdc.said.to_str();
        if self.kv.get(&event_key(&said))?.is_some() {
            return Ok(());
        }
        let raw = serde_json::to_vec(acdc).map_err(|e| Error::Internal(format!("acdc serialize failed: {e}")))?;
        let meta = EventMeta {
            event_type: "acdc".to_string(),
            said: said.clone(),
            scope: None,
            sn: None,
            prior: None,
            timestamp: Some(acdc.subject.issued_at.clone()),
            acdc: Some(said.clone()),
            issuer: Some(acdc.issuer.to_str()),
            holder: acdc.subject.recipient.as_ref().map(Prefix::to_str),
            registry: acdc.registry.as_ref().map(Prefix::to_str),
        };
        self.store_raw_and_meta(&said, &raw, &meta)
    }

    pub fn get_acdc(&self, said: &str) -> Result<Option<Acdc>, Error> {
        match self.get_event(said)? {
            Some((raw, _)) => Ok(Some(
                serde_json::from_slice(&raw).map_err(|e| Error::Internal(format!("stored acdc corrupt: {e}")))?,
            )),
            None => Ok(None),
        }
    }

    pub fn put_schema(&mut self, schema: &Schema) -> Result<(), Error> {
        let said = schema.said.to_str();
        if self.kv.get(&event_key(&said))?.is_some() {
            return Ok(());
        }
        let raw = serde_json::to_vec(&schema.body).map_err(|e| Error::Internal(format!("schema serialize failed: {e}")))?;
        let meta = EventMeta {
            event_type: "schema".to_string(),
            said: said.clone(),
            scope: None,
            sn: None,
            prior: None,
            timestamp: None,
            acdc: None,
            issuer: None,
            holder: None,
            registry: None,
        };
        self.store_raw_and_meta(&said, &raw, &meta)
    }

    pub fn get_schema(&self, said: &str) -> Result<Option<serde_json::Value>, Error> {
        match self.get_event(said)? {
            Some((raw, _)) => {
                Ok(Some(serde_json::from_slice(&raw).map_err(|e| Error::Internal(format!("stored schema corrupt: {e}")))?))
            }
            None => Ok(None),
        }
    }

    /// Binds `alias` to `said` within `scope`; last-writer-wins is the
    /// concurrency contract (spec §5), but a *collision* -- the same
    /// alias already bound to a *different* said -- is rejected.
    pub fn put_alias(&mut self, scope: AliasScope, said: &str, alias: &str) -> Result<(), Error> {
        if let Some(existing) = self.kv.get(&alias_said_key(scope, alias))? {
            let existing = String::from_utf8(existing).map_err(|e| Error::Internal(format!("bad alias bytes: {e}")))?;
            if existing != said {
                return Err(Error::AliasCollision);
            }
        }
        self.kv.put(&alias_said_key(scope, alias), said.as_bytes().to_vec())
    }

    pub fn get_alias_said(&self, scope: AliasScope, alias: &str) -> Result<Option<String>, Error> {
        self.kv
            .get(&alias_said_key(scope, alias))?
            .map(|b| String::from_utf8(b).map_err(|e| Error::Internal(format!("bad alias bytes: {e}"))))
            .transpose()
    }

    pub fn get_said_alias(&self, scope: AliasScope, said: &str) -> Result<Option<String>, Error> {
        for (key, value) in self.kv.list(&alias_scope_prefix(scope), ListOptions::default())? {
            if let Some(v) = value {
                if v == said.as_bytes() {
                    let alias = key.rsplit('/').next().unwrap_or_default().to_string();
                    return Ok(Some(alias));
                }
            }
        }
        Ok(None)
    }

    pub fn list_aliases(&self, scope: AliasScope) -> Result<Vec<(String, String)>, Error> {
        let mut out = Vec::new();
        for (key, value) in self.kv.list(&alias_scope_prefix(scope), ListOptions::default())? {
            let alias = key.rsplit('/').next().unwrap_or_default().to_string();
            let said = value
                .map(|v| String::from_utf8(v).map_err(|e| Error::Internal(format!("bad alias bytes: {e}"))))
                .transpose()?
                .unwrap_or_default();
            out.push((alias, said));
        }
        Ok(out)
    }

    pub fn del_alias(&mut self, scope: AliasScope, alias: &str) -> Result<(), Error> {
        self.kv.del(&alias_said_key(scope, alias))
    }

    /// Events (KEL or TEL) whose `p` equals `prior_said` (spec §4.7
    /// `get_by_prior`), used to buffer out-of-order ingestion until the
    /// gap closes (spec §5).
    pub fn get_by_prior(&self, prior_said: &str) -> Result<Vec<(Vec<u8>, EventMeta)>, Error> {
        let mut out = Vec::new();
        for (key, _) in self.kv.list(&prior_prefix(prior_said), ListOptions::default())? {
            let said = key.rsplit('/').next().unwrap_or_default();
            if let Some(entry) = self.get_event(said)? {
                out.push(entry);
            }
        }
        Ok(out)
    }
}
