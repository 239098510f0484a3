//! Witness/backer receipts: a non-transferable signature over an event,
//! attached outside the event's own signature group (spec §3, §6 `VRC`).

use crate::error::Error;
use crate::event::KeyEvent;
use crate::prefix::{BasicPrefix, Prefix, SelfSigningPrefix};

/// A single backer's receipt: which event, and the couplet (backer
/// identity, signature) proving it witnessed that event.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub event_said: String,
    pub backer: BasicPrefix,
    pub signature: SelfSigningPrefix,
}

impl Receipt {
    pub fn new(event: &KeyEvent, backer: BasicPrefix, signature: SelfSigningPrefix) -> Self {
        Self {
            event_said: event.said.to_str(),
            backer,
            signature,
        }
    }

    pub fn verify(&self, message: &[u8]) -> Result<bool, Error> {
        self.backer.verify(message, &self.signature)
    }
}

/// A set of receipts collected for one event, as required by `enough_receipts`
/// (spec §4.5 `ample`).
#[derive(Debug, Clone, Default)]
pub struct ReceiptSet {
    pub receipts: Vec<Receipt>,
}

impl ReceiptSet {
    pub fn add(&mut self, receipt: Receipt) {
        if !self.receipts.iter().any(|r| r.backer == receipt.backer) {
            self.receipts.push(receipt);
        }
    }

    pub fn count(&self) -> usize {
        self.receipts.len()
    }

    pub fn satisfies(&self, threshold: u64) -> bool {
        crate::event::sections::enough_receipts(self.count(), threshold)
    }
}
