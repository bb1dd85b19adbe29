use restiming::{
    compress_resource_timing, decompress_resource_timing, NamespacedValue, ServerTimingEntry,
    Session, TimingRecord,
};

fn find<'a>(records: &'a [TimingRecord], name: &str) -> &'a TimingRecord {
    records
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no record named {name}"))
}

#[test]
fn full_round_trip_preserves_fields() {
    let records = vec![
        TimingRecord {
            name: "http://site.com/js/app.js".to_string(),
            initiator_type: "script".to_string(),
            start_time: 10.0,
            fetch_start: 10.0,
            domain_lookup_start: 12.0,
            domain_lookup_end: 15.0,
            connect_start: 15.0,
            connect_end: 20.0,
            request_start: 21.0,
            response_start: 100.0,
            response_end: 110.0,
            duration: 100.0,
            encoded_body_size: Some(1000),
            transfer_size: Some(1100),
            decoded_body_size: Some(3000),
            script_async: Some(true),
            script_defer: Some(false),
            script_body: Some(true),
            next_hop_protocol: Some("http/1.1".to_string()),
            content_type: Some("text/javascript".to_string()),
            response_status: Some(404),
            server_timing: Some(vec![ServerTimingEntry {
                name: "cdn-cache".to_string(),
                duration: 12.5,
                description: "HIT".to_string(),
            }]),
            ..Default::default()
        },
        TimingRecord {
            name: "http://site.com/js/app.js.map".to_string(),
            initiator_type: "other".to_string(),
            start_time: 200.0,
            fetch_start: 200.0,
            response_start: 240.0,
            response_end: 250.0,
            duration: 50.0,
            encoded_body_size: Some(500),
            transfer_size: Some(600),
            decoded_body_size: Some(500),
            ..Default::default()
        },
    ];

    let mut session = Session::new();
    let payload = compress_resource_timing(&mut session, &records, None).unwrap();
    let decoded = decompress_resource_timing(&session, &payload);
    assert_eq!(decoded.len(), 2);

    let script = find(&decoded, "http://site.com/js/app.js");
    assert_eq!(script.initiator_type, "script");
    assert_eq!(script.start_time, 10.0);
    assert_eq!(script.fetch_start, 10.0);
    assert_eq!(script.domain_lookup_start, 12.0);
    assert_eq!(script.domain_lookup_end, 15.0);
    assert_eq!(script.connect_start, 15.0);
    assert_eq!(script.connect_end, 20.0);
    assert_eq!(script.request_start, 21.0);
    assert_eq!(script.response_start, 100.0);
    assert_eq!(script.response_end, 110.0);
    assert_eq!(script.duration, 100.0);
    assert_eq!(script.encoded_body_size, Some(1000));
    assert_eq!(script.transfer_size, Some(1100));
    assert_eq!(script.decoded_body_size, Some(3000));
    assert_eq!(script.script_async, Some(true));
    assert_eq!(script.script_defer, Some(false));
    assert_eq!(script.script_body, Some(true));
    // the normalized protocol form is what comes back, not the raw header
    assert_eq!(script.next_hop_protocol.as_deref(), Some("h1.1"));
    assert_eq!(script.content_type.as_deref(), Some("text/javascript"));
    assert_eq!(script.response_status, Some(404));
    let st = script.server_timing.as_ref().unwrap();
    assert_eq!(st.len(), 1);
    assert_eq!(st[0].name, "cdn-cache");
    assert_eq!(st[0].duration, 12.5);
    assert_eq!(st[0].description, "HIT");

    let map = find(&decoded, "http://site.com/js/app.js.map");
    assert_eq!(map.initiator_type, "other");
    assert_eq!(map.start_time, 200.0);
    assert_eq!(map.response_end, 250.0);
    // 200 is implied, never transmitted
    assert_eq!(map.response_status, None);
}

#[test]
fn duplicate_urls_stack_and_round_trip() {
    let records = vec![
        TimingRecord {
            name: "http://site.com/api".to_string(),
            initiator_type: "xmlhttprequest".to_string(),
            start_time: 10.0,
            fetch_start: 10.0,
            response_end: 50.0,
            duration: 40.0,
            ..Default::default()
        },
        TimingRecord {
            name: "http://site.com/api".to_string(),
            initiator_type: "xmlhttprequest".to_string(),
            start_time: 300.0,
            fetch_start: 300.0,
            response_end: 340.0,
            duration: 40.0,
            ..Default::default()
        },
    ];

    let mut session = Session::new();
    let payload = compress_resource_timing(&mut session, &records, None).unwrap();
    let decoded = decompress_resource_timing(&session, &payload);

    assert_eq!(decoded.len(), 2);
    let mut starts: Vec<f64> = decoded.iter().map(|r| r.start_time).collect();
    starts.sort_by(f64::total_cmp);
    assert_eq!(starts, vec![10.0, 300.0]);
    for r in &decoded {
        assert_eq!(r.name, "http://site.com/api");
        assert_eq!(r.initiator_type, "xmlhttprequest");
    }
}

#[test]
fn dimensions_attach_to_every_stacked_resource() {
    let records = vec![TimingRecord {
        name: "http://site.com/hero.png".to_string(),
        initiator_type: "img".to_string(),
        start_time: 5.0,
        fetch_start: 5.0,
        response_end: 25.0,
        duration: 20.0,
        ..Default::default()
    }];

    let mut dims = std::collections::HashMap::new();
    dims.insert(
        "http://site.com/hero.png".to_string(),
        vec![100u64, 200, 10, 20],
    );

    let mut session = Session::new();
    let payload = compress_resource_timing(&mut session, &records, Some(&dims)).unwrap();
    let decoded = decompress_resource_timing(&session, &payload);

    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].height, Some(100));
    assert_eq!(decoded[0].width, Some(200));
    assert_eq!(decoded[0].y, Some(10));
    assert_eq!(decoded[0].x, Some(20));
    assert_eq!(decoded[0].natural_height, Some(100));
    assert_eq!(decoded[0].natural_width, Some(200));
}

#[test]
fn namespaced_data_round_trips() {
    let mut data = std::collections::BTreeMap::new();
    data.insert(
        "trace".to_string(),
        NamespacedValue::Many(vec!["abc".to_string(), "def".to_string()]),
    );
    data.insert(
        "pop".to_string(),
        NamespacedValue::One("iad".to_string()),
    );

    let records = vec![TimingRecord {
        name: "http://site.com/api".to_string(),
        initiator_type: "fetch".to_string(),
        start_time: 1.0,
        fetch_start: 1.0,
        response_end: 41.0,
        duration: 40.0,
        data: Some(data.clone()),
        ..Default::default()
    }];

    let mut session = Session::new();
    let payload = compress_resource_timing(&mut session, &records, None).unwrap();
    let decoded = decompress_resource_timing(&session, &payload);

    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].data.as_ref(), Some(&data));
}

#[test]
fn unknown_protocol_grows_the_session_map_and_round_trips() {
    let records = vec![TimingRecord {
        name: "http://site.com/x".to_string(),
        initiator_type: "other".to_string(),
        start_time: 10.0,
        fetch_start: 10.0,
        response_end: 110.0,
        duration: 100.0,
        transfer_size: Some(5),
        encoded_body_size: Some(5),
        decoded_body_size: Some(5),
        next_hop_protocol: Some("spdy/3.1".to_string()),
        ..Default::default()
    }];

    let mut session = Session::new();
    let payload = compress_resource_timing(&mut session, &records, None).unwrap();
    assert_eq!(
        session.next_hop_protocols.appended_values(),
        &["spdy/3.1".to_string()]
    );

    let decoded = decompress_resource_timing(&session, &payload);
    assert_eq!(decoded[0].next_hop_protocol.as_deref(), Some("spdy/3.1"));
}

#[test]
fn payload_survives_json_serialization() {
    let records = vec![
        TimingRecord {
            name: "http://site.com/a/b".to_string(),
            initiator_type: "img".to_string(),
            start_time: 10.0,
            fetch_start: 10.0,
            response_end: 50.0,
            duration: 40.0,
            ..Default::default()
        },
        TimingRecord {
            name: "http://site.com/a/c".to_string(),
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
    let parsed = serde_json::from_str(&json).unwrap();
    assert_eq!(payload, parsed);

    let decoded = decompress_resource_timing(&session, &parsed);
    assert_eq!(decoded.len(), 2);
}
