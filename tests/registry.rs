//! Conversion register shared between an API and generic decoders.

use std::sync::Arc;

use restful_api::routing::ApiOptions;
use restful_api::types::TypeError;
use restful_api::{ConversionRegister, RestfulApi, TypeInfo};
use serde_json::json;

mod common;

#[test]
fn test_api_registers_into_shared_register() {
    let register = Arc::new(ConversionRegister::new());
    let api = RestfulApi::with_register(common::users_tree(), ApiOptions::default(), register.clone())
        .unwrap();

    assert!(Arc::ptr_eq(api.register(), &register));
    let description = json!({ "type": "object" });
    assert_eq!(
        register.import_tagged(&description, r#"{"name":"ada"}"#).unwrap(),
        json!({ "name": "ada" })
    );
    assert!(register.import_tagged(&description, "{}").is_err());
}

#[test]
fn test_later_registration_wins_for_lookups() {
    let register = ConversionRegister::new();
    register.register(&TypeInfo::number_range(0.0, 10.0)).unwrap();
    assert!(register.import_from_string("numberRange", "50").is_err());

    register.register(&TypeInfo::number_range(0.0, 100.0)).unwrap();
    assert_eq!(register.import_from_string("numberRange", "50").unwrap(), json!(50));
}

#[test]
fn test_unknown_identifier_is_an_error() {
    let register = ConversionRegister::new();
    assert_eq!(
        register.import_tagged(&json!({ "type": "matrix" }), "[]").unwrap_err(),
        TypeError::UnknownType("matrix".to_string())
    );
}

#[tokio::test]
async fn test_readers_see_whole_tables_during_writes() {
    let register = Arc::new(ConversionRegister::with_defaults(false).unwrap());
    let writer = {
        let register = register.clone();
        tokio::spawn(async move {
            for max in 1..200 {
                register
                    .register(&TypeInfo::bounded_array(TypeInfo::any(), None, Some(max)))
                    .unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    for _ in 0..200 {
        assert!(register.contains("string"));
        assert!(register.lookup("array").is_ok());
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
    assert!(register.import_from_string("array", "[1,2,3]").is_ok());
}
