//! `ixn`: anchors external seals without touching signing keys
//! (spec §4.4). Non-establishment: does not participate in pre-rotation
//! accounting.

use serde_json::{json, Value};

use crate::event::sections::seal::Seal;
use crate::prefix::SelfAddressingPrefix;

/// Body of an `ixn` event: canonical field order `p a`.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionData {
    pub previous_event_said: SelfAddressingPrefix,
    pub seals: Vec<Seal>,
}

impl InteractionData {
    pub fn new(previous_event_said: SelfAddressingPrefix, seals: Vec<Seal>) -> Self {
        Self {
            previous_event_said,
            seals,
        }
    }

    pub fn to_ordered_fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("p", json!(self.previous_event_said)),
            ("a", json!(self.seals)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::SelfAddressing;

    #[test]
    fn field_order_is_p_then_a() {
        let ixn = InteractionData::new(SelfAddressing::Blake3_256.derive(b"prior"), vec![]);
        let fields = ixn.to_ordered_fields();
        assert_eq!(fields[0].0, "p");
        assert_eq!(fields[1].0, "a");
    }
}
