//! Line-oriented on-wire framing (spec §6): a SAD JSON line, optionally
//! prefixed by a framing token, followed by `-`-prefixed CESR attachment
//! groups. Unknown attachment codes are retained as opaque blobs.

use nom::bytes::complete::{tag, take};
use nom::combinator::map_res;
use nom::multi::many0;
use nom::sequence::tuple;
use nom::IResult;

use crate::error::Error;
use crate::event::KeyEvent;
use crate::event_message::SignedEventMessage;
use crate::prefix::{AttachedSignaturePrefix, Prefix, SelfSigningPrefix};

/// One parsed `-`-prefixed attachment group.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    IndexedSignatures(Vec<AttachedSignaturePrefix>),
    WitnessSignatures(Vec<AttachedSignaturePrefix>),
    Receipt(Vec<u8>),
    Seal(Vec<u8>),
    /// An attachment whose 3-letter code isn't recognized; kept verbatim
    /// for forward compatibility.
    Unknown { code: String, body: String },
}

fn json_event(s: &str) -> IResult<&str, KeyEvent> {
    let mut stream = serde_json::Deserializer::from_str(s).into_iter::<KeyEvent>();
    match stream.next() {
        Some(Ok(event)) => {
            let offset = stream.byte_offset();
            Ok((&s[offset..], event))
        }
        _ => Err(nom::Err::Error(nom::error::Error::new(s, nom::error::ErrorKind::IsNot))),
    }
}

/// Parses a two-digit decimal count, e.g. the `05` in `-AAB05`.
fn decimal_count(s: &str) -> IResult<&str, u16> {
    map_res(take(2u8), |d: &str| d.parse::<u16>())(s)
}

fn indexed_signature(s: &str) -> IResult<&str, AttachedSignaturePrefix> {
    let (rest, (index, sig_text)) = tuple((decimal_count, take(88u8)))(s)?;
    let signature: SelfSigningPrefix = sig_text
        .parse()
        .map_err(|_| nom::Err::Failure(nom::error::Error::new(s, nom::error::ErrorKind::Verify)))?;
    Ok((rest, AttachedSignaturePrefix::new(signature, index)))
}

fn attachment_group(s: &str) -> IResult<&str, Attachment> {
    let (rest, (_, code, count)) = tuple((tag("-"), take(3u8), decimal_count))(s)?;
    match code {
        "AAB" | "FAB" => {
            let (rest, sigs) = many0(indexed_signature)(rest)?;
            if sigs.len() != count as usize {
                return Err(nom::Err::Error(nom::error::Error::new(s, nom::error::ErrorKind::Count)));
            }
            let attachment = if code == "AAB" {
                Attachment::IndexedSignatures(sigs)
            } else {
                Attachment::WitnessSignatures(sigs)
            };
            Ok((rest, attachment))
        }
        "VRC" | "SAB" => {
            let (rest, body) = take(count as usize * 44usize)(rest)?;
            let attachment = if code == "VRC" {
                Attachment::Receipt(body.as_bytes().to_vec())
            } else {
                Attachment::Seal(body.as_bytes().to_vec())
            };
            Ok((rest, attachment))
        }
        other => {
            let split_at = rest[1..].find('-').map(|i| i + 1).unwrap_or(rest.len());
            let (body, rest) = rest.split_at(split_at);
            Ok((
                rest,
                Attachment::Unknown {
                    code: other.to_string(),
                    body: body.to_string(),
                },
            ))
        }
    }
}

/// Parses one SAD event followed by zero or more attachment groups.
pub fn signed_message(s: &str) -> IResult<&str, SignedEventMessage> {
    let (rest, (event, attachments)) = tuple((json_event, many0(attachment_group)))(s)?;
    let signatures = attachments
        .into_iter()
        .filter_map(|a| match a {
            Attachment::IndexedSignatures(sigs) => Some(sigs),
            _ => None,
        })
        .flatten()
        .collect();
    Ok((rest, SignedEventMessage::new(event, signatures)))
}

/// Parses a concatenated stream of SAD+attachment messages (spec §6
/// on-wire format).
pub fn signed_event_stream(s: &str) -> IResult<&str, Vec<SignedEventMessage>> {
    many0(signed_message)(s)
}

/// Parses a single event line, re-deriving nothing -- callers that need
/// SAID verification should route the result through the verifier.
pub fn parse_event(raw: &str) -> Result<KeyEvent, Error> {
    json_event(raw)
        .map(|(_, event)| event)
        .map_err(|e| Error::ParseError(format!("malformed event: {e}")))
}
