//! Cross-module scenario test: builds a KEL, verifies it, issues a
//! credential through a TEL, runs it through the import pipeline, and
//! checks the round trip end to end.

use keri_core::acdc::{Acdc, Subject};
use keri_core::bundle::{from_bundle, Bundle, BundleMetadata, BundleType, ImportOptions};
use keri_core::consts::Protocol;
use keri_core::derivation::{Basic, SelfAddressing};
use keri_core::event::event_data::{EventData, InceptionData};
use keri_core::event::sections::KeyConfig;
use keri_core::event_message::{build_key_event, SerializationFormats, SignedEventMessage};
use keri_core::prefix::{AttachedSignaturePrefix, IdentifierPrefix, Prefix};
use keri_core::signer::Signer;
use keri_core::store::mem::MemKv;
use keri_core::store::EventStore;
use keri_core::tel::event::{IssEvent, VcpEvent};
use keri_core::tel::TelEvent;
use keri_core::verifier::verify_kel;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn incept_verify_issue_then_import() {
    init();

    let signer = Signer::from_seed(&[42u8; 32]);
    let key = signer.prefix().clone();
    let kc = KeyConfig::new(vec![key.clone()], vec![], None, None);
    let data = EventData::Icp(InceptionData::new(kc, None, None, None, None));
    let icp = build_key_event(
        Protocol::Keri,
        SerializationFormats::JSON,
        SelfAddressing::Blake3_256,
        0,
        IdentifierPrefix::Basic(key),
        data,
        true,
    )
    .unwrap();
    let icp_msg = serde_json::to_vec(&icp).unwrap();
    let icp_sig = signer.sign(&icp_msg);
    let signed_icp = SignedEventMessage::new(icp.clone(), vec![AttachedSignaturePrefix::new(icp_sig, 0)]);

    let state = verify_kel(std::slice::from_ref(&signed_icp)).unwrap();
    assert_eq!(state.sn, 0);
    assert_eq!(state.prefix, icp.prefix);

    let mut store = EventStore::new(MemKv::new());
    store.put_kel_event(&icp).unwrap();

    let vcp = TelEvent::Vcp(VcpEvent {
        version: icp.version,
        said: SelfAddressing::Blake3_256.derive(b"registry"),
        issuer: icp.prefix.clone(),
        config_traits: vec![],
        backer_threshold: 0,
        backers: vec![],
        nonce: "#".repeat(44),
    });
    let registry_id = vcp.registry_scope().unwrap();
    store.put_tel_event(&vcp).unwrap();

    let mut data = serde_json::Map::new();
    data.insert("role".to_string(), serde_json::json!("engineer"));
    let subject = Subject::build(None, "2026-01-01T00:00:00.000000+00:00".into(), data, SelfAddressing::Blake3_256).unwrap();
    let schema_said = SelfAddressing::Blake3_256.derive(b"schema");
    let acdc = Acdc::build(icp.prefix.clone(), Some(registry_id.clone()), schema_said, subject, SelfAddressing::Blake3_256).unwrap();
    acdc.verify(SelfAddressing::Blake3_256).unwrap();

    let iss = TelEvent::Iss(IssEvent {
        version: icp.version,
        said: SelfAddressing::Blake3_256.derive(b"iss"),
        credential_said: acdc.said.clone(),
        registry_id,
        issued_at: "2026-01-01T00:00:01.000000+00:00".to_string(),
    });
    store.put_tel_event(&iss).unwrap();
    store.put_acdc(&acdc).unwrap();

    let bundle = Bundle::new(
        BundleType::Acdc,
        BundleMetadata {
            scope: Some("engineering-credentials".to_string()),
            created_at: None,
        },
        vec![serde_json::to_vec(&acdc).unwrap()],
    );
    let mut other_store = EventStore::new(MemKv::new());
    let report = from_bundle(&mut other_store, &bundle, ImportOptions::default(), || false).unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.credential_id, Some(acdc.said.to_str()));

    let second_pass = from_bundle(
        &mut other_store,
        &bundle,
        ImportOptions {
            skip_existing: true,
            verify: true,
        },
        || false,
    )
    .unwrap();
    assert_eq!(second_pass.imported, 0);
    assert_eq!(second_pass.skipped, 1);
}
