use shadow_store::{
    common::{RecordID, TID},
    storage::RecordLayout,
};

#[test]
fn test_record_addressing() {
    let layout = RecordLayout::new(4096, 100);
    assert_eq!(layout.records_per_page(), 40);

    let tid = layout.locate(RecordID(41));
    assert_eq!(tid, TID::new(1, 1));
    assert_eq!(tid.to_record_id(40), RecordID(41));
    assert_eq!(layout.slot_range(1), 100..200);
    // The last 96 bytes of a 4096-byte page never hold a record
    assert_eq!(layout.slot_range(39).end, 4000);
}

#[test]
fn test_padding_and_truncation() {
    let layout = RecordLayout::new(64, 8);

    assert_eq!(layout.encode(b"abc"), b"abc\0\0\0\0\0".to_vec());
    assert_eq!(layout.encode(b"0123456789"), b"01234567".to_vec());
    assert_eq!(layout.decode(b"abc\0\0\0\0\0"), b"abc".to_vec());
    assert_eq!(layout.decode(&[0; 8]), Vec::<u8>::new());
    // Interior zeros survive, only the tail is stripped
    assert_eq!(layout.decode(b"a\0b\0\0\0\0\0"), b"a\0b".to_vec());
}

#[test]
fn test_tid_ordering() {
    let mut tids = vec![TID::new(2, 0), TID::new(0, 5), TID::new(0, 1)];
    tids.sort();
    assert_eq!(tids, vec![TID::new(0, 1), TID::new(0, 5), TID::new(2, 0)]);
}
