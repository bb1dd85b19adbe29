use restiming::{
    compress_resource_timing, decompress_resource_timing, Session, TimingRecord,
};

#[test]
fn sensitive_words_never_appear_in_the_payload() {
    let records = vec![
        TimingRecord {
            name: "http://site.com/redirect?href=http://evil.com".to_string(),
            initiator_type: "img".to_string(),
            start_time: 10.0,
            fetch_start: 10.0,
            response_end: 50.0,
            duration: 40.0,
            ..Default::default()
        },
        TimingRecord {
            name: "http://site.com/form?action=submit&src=x".to_string(),
            initiator_type: "img".to_string(),
            start_time: 20.0,
            fetch_start: 20.0,
            response_end: 60.0,
            duration: 40.0,
            ..Default::default()
        },
    ];

    let mut session = Session::new();
    let payload = compress_resource_timing(&mut session, &records, None).unwrap();
    let json = serde_json::to_string(&payload).unwrap();

    assert!(!json.to_lowercase().contains("href"));
    assert!(!json.to_lowercase().contains("src"));
    assert!(!json.to_lowercase().contains("action"));
    // the break placeholder itself is also gone after optimization
    assert!(!json.contains("\\n"));
}

#[test]
fn broken_urls_decode_back_to_the_original() {
    let records = vec![TimingRecord {
        name: "http://site.com/redirect?href=http://evil.com".to_string(),
        initiator_type: "img".to_string(),
        start_time: 10.0,
        fetch_start: 10.0,
        response_end: 50.0,
        duration: 40.0,
        ..Default::default()
    }];

    let mut session = Session::new();
    let payload = compress_resource_timing(&mut session, &records, None).unwrap();
    let decoded = decompress_resource_timing(&session, &payload);

    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].name, "http://site.com/redirect?href=http://evil.com");
}
