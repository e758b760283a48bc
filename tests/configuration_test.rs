use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use filtable::configuration::{
    ExtractedFilter, FieldBinding, FilterKeyword, HeadingConfig, Tag, convert_collection_of_tags,
    decode_config, encode_config, extract_filters, extract_tags, extract_texts,
    merge_texts_into_config, preview_listing, process_extracted_filters, resolve_configuration,
};
use filtable::dataset::Row;
use filtable::error::{DecodeError, FiltableError};
use serde_json::json;

// Helper to build a row from (heading, value) pairs
fn row(pairs: &[(&str, &str)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn sample_row() -> Row {
    row(&[
        ("Name", "Community Garden Grant"),
        ("Summary", "Funding for shared gardens"),
        ("Agency", "Parks Board"),
        ("Deadline", ""),
        ("Url", "https://example.org/garden"),
        ("Category", "Environment"),
        ("Region", ""),
    ])
}

fn full_config() -> HeadingConfig {
    HeadingConfig::new()
        .with(FieldBinding::ListingTitle("Grants für alle".into()))
        .with(FieldBinding::Title("Name".into()))
        .with(FieldBinding::Description("Summary".into()))
        .with(FieldBinding::Text(1, "Agency".into()))
        .with(FieldBinding::Text(2, "".into()))
        .with(FieldBinding::Link("Url".into()))
        .with(FieldBinding::Filter(FilterKeyword::Checkbox, "Category".into()))
        .with(FieldBinding::Filter(FilterKeyword::Checkbox, "Region".into()))
}

fn checkbox(heading: &str) -> ExtractedFilter {
    ExtractedFilter {
        heading: heading.to_string(),
        kind: FilterKeyword::Checkbox,
    }
}

// Test extraction of filter bindings

#[test]
fn extract_filters_excludes_display_fields() {
    let config: HeadingConfig =
        serde_json::from_value(json!({ "Title": "Name", "Checkbox": "Category" })).unwrap();

    assert_eq!(extract_filters(&config), vec![checkbox("Category")]);
}

#[test]
fn extract_filters_keeps_declaration_order() {
    let config: HeadingConfig = serde_json::from_value(json!({
        "Checkbox": ["Region", "Category", "Agency"],
        "Title": "Name",
        "Text 1": "Agency"
    }))
    .unwrap();

    assert_eq!(
        extract_filters(&config),
        vec![checkbox("Region"), checkbox("Category"), checkbox("Agency")]
    );
}

#[test]
fn configuration_without_filters_gives_empty_list() {
    let config = HeadingConfig::new().with(FieldBinding::Title("Name".into()));
    assert!(extract_filters(&config).is_empty());

    let encoded = encode_config(&[config]);
    let resolved = resolve_configuration(Some(encoded.as_str())).unwrap();
    assert!(extract_filters(&resolved).is_empty());
}

#[test]
fn absent_configuration_is_an_error() {
    assert!(matches!(
        resolve_configuration(None),
        Err(FiltableError::MissingConfiguration)
    ));
    assert!(matches!(
        resolve_configuration(Some("  ")),
        Err(FiltableError::MissingConfiguration)
    ));
    // An encoded empty list holds no configuration either
    assert!(matches!(
        resolve_configuration(Some(encode_config(&[]).as_str())),
        Err(FiltableError::MissingConfiguration)
    ));
}

#[test]
fn process_groups_by_kind() {
    let processed =
        process_extracted_filters(&[checkbox("Category"), checkbox("Region")]);
    assert_eq!(processed.get(FilterKeyword::Checkbox), ["Category", "Region"]);
    assert!(!processed.is_empty());
}

#[test]
fn process_empty_input_still_has_every_kind() {
    let processed = process_extracted_filters(&[]);
    for kind in FilterKeyword::ALL {
        assert!(processed.get(kind).is_empty());
    }
    assert!(processed.is_empty());
    assert_eq!(
        serde_json::to_value(&processed).unwrap(),
        json!({ "Checkbox": [] })
    );
}

// Test urlConfig encoding

#[test]
fn encode_decode_round_trip() {
    let single = full_config();
    let decoded = decode_config(&encode_config(std::slice::from_ref(&single))).unwrap();
    assert_eq!(decoded, vec![single.clone()]);

    let several = vec![
        single,
        HeadingConfig::new(),
        HeadingConfig::new()
            .with(FieldBinding::Title("Name".into()))
            .with(FieldBinding::Text(3, "Agency".into())),
    ];
    assert_eq!(decode_config(&encode_config(&several)).unwrap(), several);
}

#[test]
fn encoded_config_is_url_safe() {
    let encoded = encode_config(&[full_config()]);
    assert!(
        encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
}

#[test]
fn decode_accepts_padding_and_single_object() {
    let mut encoded = encode_config(&[full_config()]);
    while encoded.len() % 4 != 0 {
        encoded.push('=');
    }
    assert_eq!(decode_config(&encoded).unwrap(), vec![full_config()]);

    let single = URL_SAFE_NO_PAD.encode(r#"{"Title":"Name"}"#);
    assert_eq!(
        decode_config(&single).unwrap(),
        vec![HeadingConfig::new().with(FieldBinding::Title("Name".into()))]
    );
}

#[test]
fn decode_rejects_garbage() {
    assert!(decode_config("garbage-not-base64").is_err());
    assert!(matches!(
        resolve_configuration(Some("garbage-not-base64")),
        Err(FiltableError::Decode(_))
    ));
    assert!(matches!(
        decode_config("not base64 at all!"),
        Err(DecodeError::Base64(_))
    ));
}

#[test]
fn decode_rejects_well_encoded_but_malformed_payloads() {
    let non_utf8 = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd]);
    assert!(matches!(decode_config(&non_utf8), Err(DecodeError::Utf8(_))));

    for payload in [
        r#"[{"Title": 5}]"#,
        r#"[{"Colour": "Name"}]"#,
        r#"[{"Text 0": "Name"}]"#,
        r#"[{"Checkbox": [1, 2]}]"#,
        r#"[{"Title": "Name""#,
        r#""just a string""#,
    ] {
        let encoded = URL_SAFE_NO_PAD.encode(payload);
        assert!(
            matches!(decode_config(&encoded), Err(DecodeError::Json(_))),
            "payload should be rejected: {}",
            payload
        );
    }
}

// Test wizard projections of the sample row

#[test]
fn extract_texts_uses_placeholders() {
    let config = full_config()
        .with(FieldBinding::Text(3, "Deadline".into()))
        .with(FieldBinding::Text(4, "Renamed Column".into()));

    assert_eq!(
        extract_texts(&sample_row(), &config),
        vec!["Parks Board", "<Text 2>", "<Text 3>", "<Text 4>"]
    );
}

#[test]
fn extract_and_convert_tags() {
    let config = full_config().with(FieldBinding::Filter(
        FilterKeyword::Checkbox,
        "Renamed Column".into(),
    ));

    let tags = extract_tags(&sample_row(), &config);
    assert_eq!(tags.len(), FilterKeyword::ALL.len());

    assert_eq!(
        convert_collection_of_tags(tags),
        vec![
            Tag::new("Category", "Environment"),
            Tag::new("Region", "<Region>"),
            Tag::new("Renamed Column", "<Renamed Column>"),
        ]
    );
}

#[test]
fn merge_texts_numbers_from_one() {
    let config = HeadingConfig::new()
        .with(FieldBinding::Title("Name".into()))
        .with(FieldBinding::Text(5, "Region".into()));
    let merged = merge_texts_into_config(&config, &["Agency".to_string(), String::new()]);

    let texts: Vec<(usize, &str)> = merged.texts().collect();
    assert_eq!(texts, vec![(1, "Agency"), (2, "")]);
    assert_eq!(merged.title(), Some("Name"));
    // Input untouched
    assert_eq!(config.texts().count(), 1);
}

#[test]
fn merge_texts_drops_removed_rows() {
    let config = HeadingConfig::new()
        .with(FieldBinding::Title("Name".into()))
        .with(FieldBinding::Text(1, "Summary".into()))
        .with(FieldBinding::Text(2, "Agency".into()));

    let merged = merge_texts_into_config(&config, &["Url".to_string()]);
    let texts: Vec<(usize, &str)> = merged.texts().collect();
    assert_eq!(texts, vec![(1, "Url")]);
    assert_eq!(
        extract_texts(&sample_row(), &merged),
        vec!["https://example.org/garden"]
    );

    let cleared = merge_texts_into_config(&config, &[]);
    assert_eq!(cleared.texts().count(), 0);
}

#[test]
fn text_zero_is_never_stored() {
    let config = HeadingConfig::new()
        .with(FieldBinding::Title("Name".into()))
        .with(FieldBinding::Text(0, "Agency".into()));
    assert_eq!(config.texts().count(), 0);

    let decoded = decode_config(&encode_config(std::slice::from_ref(&config))).unwrap();
    assert_eq!(decoded, vec![config]);
}

#[test]
fn preview_falls_back_to_placeholders() {
    let preview = preview_listing(&sample_row(), &HeadingConfig::new());
    assert_eq!(preview.title, "<Title>");
    assert_eq!(preview.description, "<Description>");
    assert_eq!(preview.link, "<link>");
    assert!(preview.list_of_texts.is_empty());
    assert!(preview.converted_collection_of_tags.is_empty());

    let preview = preview_listing(&sample_row(), &full_config());
    assert_eq!(preview.title, "Community Garden Grant");
    assert_eq!(preview.description, "Funding for shared gardens");
    assert_eq!(preview.link, "https://example.org/garden");
}

// Test publish validation

#[test]
fn title_gates_publishing() {
    assert!(!HeadingConfig::new().is_publishable());
    assert!(matches!(
        HeadingConfig::new()
            .with(FieldBinding::Link("Url".into()))
            .validate_for_publish(),
        Err(FiltableError::InvalidConfiguration)
    ));
    assert!(
        !HeadingConfig::new()
            .with(FieldBinding::Title(String::new()))
            .is_publishable()
    );
    assert!(full_config().validate_for_publish().is_ok());
}

#[test]
fn reports_unknown_headings_once() {
    let headings: Vec<String> = ["Name", "Summary", "Url", "Category"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let config = full_config()
        .with(FieldBinding::Text(3, "Region".into()))
        .with(FieldBinding::Filter(FilterKeyword::Checkbox, "Agency".into()));

    assert_eq!(config.unknown_headings(&headings), vec!["Agency", "Region"]);
}

#[test]
fn bindings_are_canonical_and_filters_deduplicated() {
    let mut config = HeadingConfig::new();
    config.bind(FieldBinding::Filter(FilterKeyword::Checkbox, "Category".into()));
    config.bind(FieldBinding::Link("Url".into()));
    config.bind(FieldBinding::Title("Name".into()));
    config.bind(FieldBinding::Filter(FilterKeyword::Checkbox, "Category".into()));

    assert_eq!(
        config.bindings(),
        vec![
            FieldBinding::Title("Name".into()),
            FieldBinding::Link("Url".into()),
            FieldBinding::Filter(FilterKeyword::Checkbox, "Category".into()),
        ]
    );

    config.unbind_filter(FilterKeyword::Checkbox, "Category");
    assert!(extract_filters(&config).is_empty());
}
