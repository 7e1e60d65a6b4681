use mp4codec::{Error, FourCC, SliceReader, SliceWriter, default_registry, encode_box, read_box_header, write_box_header};
use proptest::prelude::*;

fn encode_header(size: u64) -> Vec<u8> {
    let len = if size >= 1 << 32 { 16 } else { 8 };
    let mut w = SliceWriter::new(len);
    write_box_header(&mut w, FourCC(*b"test"), size).unwrap();
    w.finish().unwrap()
}

#[test]
fn header_sizes_round_trip() {
    for size in [8u64, 65535, (1 << 32) - 1, 1 << 32, 1 << 40] {
        let bytes = encode_header(size);
        let large = size >= 1 << 32;
        assert_eq!(bytes.len(), if large { 16 } else { 8 }, "size {size}");
        if large {
            assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        }

        let hdr = read_box_header(&mut SliceReader::new(&bytes)).unwrap();
        assert_eq!(hdr.typ, FourCC(*b"test"));
        assert_eq!(hdr.size, size);
        assert_eq!(hdr.header_size, bytes.len() as u64);
    }
}

#[test]
fn size_zero_is_rejected() {
    let bytes = [0, 0, 0, 0, b'm', b'd', b'a', b't'];
    let err = read_box_header(&mut SliceReader::new(&bytes)).unwrap_err();
    assert!(matches!(err, Error::SizeExtendsToEof));
}

#[test]
fn size_smaller_than_header_is_rejected() {
    let bytes = [0, 0, 0, 4, b'f', b'r', b'e', b'e'];
    let err = read_box_header(&mut SliceReader::new(&bytes)).unwrap_err();
    assert!(matches!(err, Error::InvalidSize { size: 4, header_len: 8 }));

    let mut large = vec![0, 0, 0, 1];
    large.extend_from_slice(b"free");
    large.extend_from_slice(&12u64.to_be_bytes());
    let err = read_box_header(&mut SliceReader::new(&large)).unwrap_err();
    assert!(matches!(err, Error::InvalidSize { size: 12, header_len: 16 }));
}

#[test]
fn truncated_header_is_reported() {
    let bytes = [0, 0, 0, 1, b'f', b'r', b'e', b'e', 0, 0];
    let err = read_box_header(&mut SliceReader::new(&bytes)).unwrap_err();
    assert!(matches!(err, Error::Truncated { position: 8, needed: 8, available: 2 }));
}

#[test]
fn large_header_for_small_box_reencodes_compact() {
    let mut bytes = vec![0, 0, 0, 1];
    bytes.extend_from_slice(b"zzzz");
    bytes.extend_from_slice(&20u64.to_be_bytes());
    bytes.extend_from_slice(&[9, 8, 7, 6]);

    let b = default_registry().decode_box(0, &mut SliceReader::new(&bytes)).unwrap();
    assert_eq!(b.size(), 12);
    let out = encode_box(b.as_ref()).unwrap();
    assert_eq!(out, [0, 0, 0, 12, b'z', b'z', b'z', b'z', 9, 8, 7, 6]);
}

proptest! {
    #[test]
    fn any_header_size_round_trips(size in 8u64..u64::MAX) {
        let bytes = encode_header(size);
        let hdr = read_box_header(&mut SliceReader::new(&bytes)).unwrap();
        prop_assert_eq!(hdr.size, size);
        prop_assert_eq!(hdr.header_size, if size >= 1 << 32 { 16 } else { 8 });
    }

    #[test]
    fn unknown_payload_reencodes_exactly(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut bytes = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(b"zzzz");
        bytes.extend_from_slice(&payload);

        let b = default_registry().decode_box(0, &mut SliceReader::new(&bytes)).unwrap();
        prop_assert_eq!(b.size(), bytes.len() as u64);
        prop_assert_eq!(encode_box(b.as_ref()).unwrap(), bytes);
    }
}
