use quickcheck::quickcheck;
use restiming::base36;

quickcheck! {
    fn encode_decode_inverse(n: i32) -> bool {
        let n = n as i64;
        base36::decode(&base36::encode(n)) == n
    }

    fn encode_is_lowercase_alnum(n: u32) -> bool {
        base36::encode(n as i64)
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    }

    fn decode_never_panics(s: String) -> bool {
        let _ = base36::decode(&s);
        true
    }
}

#[test]
fn ordering_is_preserved_for_equal_lengths() {
    // same-length base-36 strings sort like their values
    let a = base36::encode(100);
    let b = base36::encode(200);
    assert_eq!(a.len(), b.len());
    assert!(a < b);
}
