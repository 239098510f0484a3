//! IPEX: the `apply`/`offer`/`agree`/`grant`/`admit`/`spurn` exchange-message
//! chain that moves credentials between parties (spec §4.9). Each message
//! is a self-addressing `exn` envelope; the chain validator checks that a
//! message's declared prior matches an actual prior `d` and that the route
//! transition is legal.

use serde_json::{json, Map, Value};

use crate::acdc::Acdc;
use crate::consts::Protocol;
use crate::derivation::SelfAddressing;
use crate::error::Error;
use crate::event::KeyEvent;
use crate::event_message::{SerializationFormats, SerializationInfo};
use crate::prefix::{IdentifierPrefix, Prefix, SelfAddressingPrefix};
use crate::said;
use crate::tel::IssEvent;

/// One of the six IPEX message routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpexRoute {
    Apply,
    Offer,
    Agree,
    Grant,
    Admit,
    Spurn,
}

impl IpexRoute {
    pub fn as_str(self) -> &'static str {
        match self {
            IpexRoute::Apply => "/ipex/apply",
            IpexRoute::Offer => "/ipex/offer",
            IpexRoute::Agree => "/ipex/agree",
            IpexRoute::Grant => "/ipex/grant",
            IpexRoute::Admit => "/ipex/admit",
            IpexRoute::Spurn => "/ipex/spurn",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "/ipex/apply" => Ok(IpexRoute::Apply),
            "/ipex/offer" => Ok(IpexRoute::Offer),
            "/ipex/agree" => Ok(IpexRoute::Agree),
            "/ipex/grant" => Ok(IpexRoute::Grant),
            "/ipex/admit" => Ok(IpexRoute::Admit),
            "/ipex/spurn" => Ok(IpexRoute::Spurn),
            other => Err(Error::ParseError(format!("unknown ipex route {other}"))),
        }
    }

    /// `apply`, `offer`, and `grant` may open an exchange with no prior
    /// message; `agree`, `admit`, and `spurn` must reference one.
    pub fn can_initiate(self) -> bool {
        matches!(self, IpexRoute::Apply | IpexRoute::Offer | IpexRoute::Grant)
    }

    /// The routes legal as a direct response to a message on this route.
    pub fn legal_responses(self) -> &'static [IpexRoute] {
        match self {
            IpexRoute::Apply => &[IpexRoute::Offer, IpexRoute::Spurn],
            IpexRoute::Offer => &[IpexRoute::Agree, IpexRoute::Spurn],
            IpexRoute::Agree => &[IpexRoute::Grant, IpexRoute::Spurn],
            IpexRoute::Grant => &[IpexRoute::Admit, IpexRoute::Spurn],
            IpexRoute::Admit | IpexRoute::Spurn => &[],
        }
    }
}

/// The `e` block a `grant` message carries: the credential, its issuance
/// event, and optionally the issuer's anchoring KEL event. Self-addressing
/// in its own right (spec §4.9: "the `e` block is itself self-addressing").
#[derive(Debug, Clone, PartialEq)]
pub struct GrantEmbeds {
    pub said: SelfAddressingPrefix,
    pub acdc: Acdc,
    pub iss: IssEvent,
    pub anchor: Option<KeyEvent>,
}

impl GrantEmbeds {
    pub fn build(acdc: Acdc, iss: IssEvent, anchor: Option<KeyEvent>, code: SelfAddressing) -> Result<Self, Error> {
        let mut map = Map::new();
        map.insert("d".to_string(), Value::String(crate::consts::said_placeholder()));
        map.insert("acdc".to_string(), serde_json::to_value(&acdc).map_err(|e| Error::Internal(e.to_string()))?);
        map.insert("iss".to_string(), crate::tel::TelEvent::Iss(iss.clone()).to_canonical_value());
        if let Some(ref a) = anchor {
            map.insert("anchor".to_string(), serde_json::to_value(a).map_err(|e| Error::Internal(e.to_string()))?);
        }
        let said_value = said::saidify(&Value::Object(map), &["d"], code)?;
        let said = said_value
            .get("d")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Internal("saidify dropped grant embed said".into()))?
            .parse()
            .map_err(|_: Error| Error::Internal("bad grant embed said".into()))?;
        Ok(Self { said, acdc, iss, anchor })
    }

    pub fn to_value(&self) -> Result<Value, Error> {
        let mut map = Map::new();
        map.insert("d".to_string(), json!(self.said));
        map.insert("acdc".to_string(), serde_json::to_value(&self.acdc).map_err(|e| Error::Internal(e.to_string()))?);
        map.insert("iss".to_string(), crate::tel::TelEvent::Iss(self.iss.clone()).to_canonical_value());
        if let Some(ref a) = self.anchor {
            map.insert("anchor".to_string(), serde_json::to_value(a).map_err(|e| Error::Internal(e.to_string()))?);
        }
        Ok(Value::Object(map))
    }
}

/// An IPEX exchange message: a self-addressing `exn` envelope (spec §3
/// "Exchange message (exn)").
#[derive(Debug, Clone, PartialEq)]
pub struct ExnMessage {
    pub version: SerializationInfo,
    pub said: SelfAddressingPrefix,
    pub sender: IdentifierPrefix,
    pub recipient: Option<IdentifierPrefix>,
    pub route: IpexRoute,
    pub prior: Option<SelfAddressingPrefix>,
    pub timestamp: String,
    pub attributes: Map<String, Value>,
    pub embeds: Option<Value>,
}

impl ExnMessage {
    /// Builds an exn envelope, running the same size/SAID fixpoint as a
    /// KEL event (spec §4.2 step 4).
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        sender: IdentifierPrefix,
        recipient: Option<IdentifierPrefix>,
        route: IpexRoute,
        prior: Option<SelfAddressingPrefix>,
        timestamp: String,
        attributes: Map<String, Value>,
        embeds: Option<Value>,
        code: SelfAddressing,
    ) -> Result<Self, Error> {
        if !route.can_initiate() && prior.is_none() {
            return Err(Error::InvalidInput(format!("{} must reference a prior message", route.as_str())));
        }
        let mut exn = ExnMessage {
            version: SerializationInfo::new(Protocol::Keri, SerializationFormats::JSON, 0),
            said: code.derive(&[]),
            sender,
            recipient,
            route,
            prior,
            timestamp,
            attributes,
            embeds,
        };
        let said_value = said::saidify_with_size(&exn.to_canonical_value(), &["d"], code, |size| {
            SerializationInfo::new(Protocol::Keri, SerializationFormats::JSON, size).to_str()
        })?;
        exn.version = SerializationInfo::from_str(
            said_value
                .get("v")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::Internal("saidify dropped exn version".into()))?,
        )?;
        exn.said = said_value
            .get("d")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Internal("saidify dropped exn said".into()))?
            .parse()
            .map_err(|_: Error| Error::Internal("bad exn said".into()))?;
        Ok(exn)
    }

    pub fn to_canonical_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("v".to_string(), json!(self.version.to_str()));
        map.insert("t".to_string(), json!("exn"));
        map.insert("d".to_string(), json!(self.said));
        map.insert("i".to_string(), json!(self.sender.to_str()));
        if let Some(ref r) = self.recipient {
            map.insert("rp".to_string(), json!(r.to_str()));
        }
        map.insert("r".to_string(), json!(self.route.as_str()));
        if let Some(ref p) = self.prior {
            map.insert("p".to_string(), json!(p));
        }
        map.insert("dt".to_string(), json!(self.timestamp));
        map.insert("a".to_string(), Value::Object(self.attributes.clone()));
        if let Some(ref e) = self.embeds {
            map.insert("e".to_string(), e.clone());
        }
        Value::Object(map)
    }

    pub fn verify(&self, code: SelfAddressing) -> Result<(), Error> {
        said::verify_said(&self.to_canonical_value(), "d", code)
    }
}

/// Checks that `next` is a legal response to `prior`: `next.p` points at
/// `prior.d`, and `next.r` is one of `prior.r`'s legal responses (spec
/// §4.9 chain validator, §4.4 testable property 9).
pub fn validate_chain(prior: &ExnMessage, next: &ExnMessage) -> Result<(), Error> {
    match &next.prior {
        Some(p) if *p == prior.said => {}
        Some(p) => {
            log::warn!("exn {} points at prior {} but the actual prior is {}", next.said.to_str(), p.to_str(), prior.said.to_str());
            return Err(Error::ChainRuleViolated(format!(
                "exn {} points at prior {} but the actual prior is {}",
                next.said.to_str(),
                p.to_str(),
                prior.said.to_str()
            )))
        }
        None => return Err(Error::ChainRuleViolated(format!("exn {} has no prior pointer", next.said.to_str()))),
    }
    if !prior.route.legal_responses().contains(&next.route) {
        log::warn!("{} is not a legal response to {}", next.route.as_str(), prior.route.as_str());
        return Err(Error::ChainRuleViolated(format!(
            "{} is not a legal response to {}",
            next.route.as_str(),
            prior.route.as_str()
        )));
    }
    log::trace!("exn {} chains cleanly onto {}", next.said.to_str(), prior.said.to_str());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::Protocol as P;

    fn aid(byte: u8) -> IdentifierPrefix {
        IdentifierPrefix::SelfAddressing(SelfAddressing::Blake3_256.derive(&[byte; 8]))
    }

    fn exn(route: IpexRoute, prior: Option<SelfAddressingPrefix>) -> ExnMessage {
        ExnMessage::build(
            aid(1),
            Some(aid(2)),
            route,
            prior,
            "2026-01-01T00:00:00.000000+00:00".to_string(),
            Map::new(),
            None,
            SelfAddressing::Blake3_256,
        )
        .unwrap()
    }

    #[test]
    fn apply_can_initiate_without_prior() {
        let apply = exn(IpexRoute::Apply, None);
        apply.verify(SelfAddressing::Blake3_256).unwrap();
    }

    #[test]
    fn agree_requires_prior() {
        let result = ExnMessage::build(
            aid(1),
            Some(aid(2)),
            IpexRoute::Agree,
            None,
            "2026-01-01T00:00:00.000000+00:00".to_string(),
            Map::new(),
            None,
            SelfAddressing::Blake3_256,
        );
        assert!(result.is_err());
    }

    #[test]
    fn full_chain_validates_each_transition() {
        let apply = exn(IpexRoute::Apply, None);
        let offer = exn(IpexRoute::Offer, Some(apply.said.clone()));
        validate_chain(&apply, &offer).unwrap();

        let agree = exn(IpexRoute::Agree, Some(offer.said.clone()));
        validate_chain(&offer, &agree).unwrap();

        let grant = exn(IpexRoute::Grant, Some(agree.said.clone()));
        validate_chain(&agree, &grant).unwrap();

        let admit = exn(IpexRoute::Admit, Some(grant.said.clone()));
        validate_chain(&grant, &admit).unwrap();
    }

    #[test]
    fn replacing_grant_with_apply_is_a_chain_violation() {
        let apply = exn(IpexRoute::Apply, None);
        let offer = exn(IpexRoute::Offer, Some(apply.said.clone()));
        let agree = exn(IpexRoute::Agree, Some(offer.said.clone()));
        let another_apply = exn(IpexRoute::Apply, Some(agree.said.clone()));
        assert!(matches!(validate_chain(&agree, &another_apply), Err(Error::ChainRuleViolated(_))));
    }

    #[test]
    fn wrong_prior_pointer_is_a_chain_violation() {
        let apply = exn(IpexRoute::Apply, None);
        let other = exn(IpexRoute::Apply, None);
        let offer = exn(IpexRoute::Offer, Some(other.said.clone()));
        assert!(matches!(validate_chain(&apply, &offer), Err(Error::ChainRuleViolated(_))));
    }

    #[test]
    fn grant_embeds_are_self_addressing() {
        let issuer = aid(3);
        let registry = aid(4);
        let mut data = Map::new();
        data.insert("name".to_string(), json!("alice"));
        let subject =
            crate::acdc::Subject::build(None, "2026-01-01T00:00:00.000000+00:00".into(), data, SelfAddressing::Blake3_256).unwrap();
        let schema = SelfAddressing::Blake3_256.derive(b"schema");
        let acdc = Acdc::build(issuer.clone(), Some(registry.clone()), schema, subject, SelfAddressing::Blake3_256).unwrap();
        let iss = IssEvent {
            version: SerializationInfo::new(P::Keri, SerializationFormats::JSON, 0),
            said: SelfAddressing::Blake3_256.derive(b"iss"),
            credential_said: acdc.said.clone(),
            registry_id: registry,
            issued_at: "2026-01-01T00:00:00.000000+00:00".to_string(),
        };
        let embeds = GrantEmbeds::build(acdc, iss, None, SelfAddressing::Blake3_256).unwrap();
        let value = embeds.to_value().unwrap();
        assert_eq!(value.get("d").and_then(Value::as_str), Some(embeds.said.to_str().as_str()));
    }
}
