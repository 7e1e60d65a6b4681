use mp4codec::kinds::*;
use mp4codec::{
    DecodeOptions, Error, FourCC, Mp4Box, Mp4File, SliceReader, default_registry, encode_box, write_box,
};
use mp4codec::parser::read_box_bytes;
use std::io::Cursor;

fn ftyp() -> FtypBox {
    FtypBox::new(FourCC(*b"isom"), 512, vec![FourCC(*b"isom"), FourCC(*b"iso6")])
}

fn encode_all(boxes: &[&dyn Mp4Box]) -> Vec<u8> {
    let mut out = Vec::new();
    for b in boxes {
        write_box(*b, &mut out).unwrap();
    }
    out
}

fn fragmented_file() -> Vec<u8> {
    let moov = ContainerBox::new(FourCC(*b"moov"))
        .with_child(MvhdBox::new(1000, 0, 2))
        .with_child(ContainerBox::new(FourCC(*b"mvex")).with_child(TrexBox::new(1)));
    let moof = |n: u32| {
        ContainerBox::new(FourCC(*b"moof"))
            .with_child(MfhdBox::new(n))
            .with_child(ContainerBox::new(FourCC(*b"traf")).with_child(TfhdBox::new(1)))
    };
    encode_all(&[
        &ftyp(),
        &moov,
        &moof(1),
        &MdatBox::new(vec![1; 16]),
        &moof(2),
        &MdatBox::new(vec![2; 8]),
    ])
}

#[test]
fn progressive_file() -> anyhow::Result<()> {
    let moov = ContainerBox::new(FourCC(*b"moov")).with_child(MvhdBox::new(1000, 5000, 2));
    let data = encode_all(&[&ftyp(), &FreeBox::zeroed(4), &moov, &MdatBox::new(vec![0xaa; 32])]);

    let file = Mp4File::decode(&data, &default_registry(), DecodeOptions::default())?;
    assert_eq!(file.boxes.len(), 4);
    assert_eq!(file.ftyp().map(|f| f.major_brand), Some(FourCC(*b"isom")));
    assert_eq!(file.moov(), Some(&moov));
    assert!(file.sidx().is_none());
    assert!(!file.is_fragmented());
    assert!(file.fragments().is_empty());
    assert!(file.error().is_none());
    assert_eq!(file.size(), data.len() as u64);
    assert_eq!(file.encode()?, data);
    Ok(())
}

#[test]
fn fragments_pair_moof_with_mdat() -> anyhow::Result<()> {
    let data = fragmented_file();
    let file = Mp4File::decode(&data, &default_registry(), DecodeOptions::strict())?;
    assert!(file.is_fragmented());

    let fragments = file.fragments();
    assert_eq!(fragments.len(), 2);
    for (i, f) in fragments.iter().enumerate() {
        let mfhd = f.moof.child::<MfhdBox>().expect("mfhd");
        assert_eq!(mfhd.sequence_number, i as u32 + 1);
        assert!(f.mdat.is_some());
    }
    assert_eq!(fragments[1].mdat.map(|m| m.data.len()), Some(8));
    assert_eq!(file.encode()?, data);
    Ok(())
}

#[test]
fn mvex_alone_marks_fragmented() -> anyhow::Result<()> {
    let moov = ContainerBox::new(FourCC(*b"moov"))
        .with_child(ContainerBox::new(FourCC(*b"mvex")).with_child(MehdBox::default()));
    let data = encode_all(&[&ftyp(), &moov]);
    let file = Mp4File::decode(&data, &default_registry(), DecodeOptions::strict())?;
    assert!(file.is_fragmented());
    assert!(file.fragments().is_empty());
    Ok(())
}

#[test]
fn stream_and_slice_paths_agree() -> anyhow::Result<()> {
    let data = fragmented_file();
    let reg = default_registry();
    let from_slice = Mp4File::decode(&data, &reg, DecodeOptions::strict())?;
    let from_stream = Mp4File::read_from(&mut Cursor::new(&data), &reg, DecodeOptions::strict())?;
    assert_eq!(from_slice.boxes, from_stream.boxes);

    // box by box through the stream adapter
    let mut cur = Cursor::new(&data);
    let mut offset = 0;
    let mut count = 0;
    while let Some(b) = reg.read_box(offset, &mut cur)? {
        let mut sr = SliceReader::new(&data[offset as usize..]);
        assert_eq!(&reg.decode_box(offset, &mut sr)?, &b);
        assert_eq!(encode_box(b.as_ref())?, &data[offset as usize..(offset + b.size()) as usize]);
        offset += b.size();
        count += 1;
    }
    assert_eq!(count, 6);
    Ok(())
}

#[test]
fn best_effort_keeps_boxes_before_failure() -> anyhow::Result<()> {
    let mut data = encode_all(&[&ftyp(), &FreeBox::zeroed(2)]);
    let good_len = data.len() as u64;
    // mdat declaring 100 bytes with only 10 present
    data.extend_from_slice(&100u32.to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&[0; 10]);

    let reg = default_registry();
    let err = Mp4File::decode(&data, &reg, DecodeOptions::strict()).unwrap_err();
    assert!(matches!(err, Error::ChildOverrun { offset, .. } if offset == good_len));

    let file = Mp4File::decode(&data, &reg, DecodeOptions::best_effort())?;
    assert_eq!(file.boxes.len(), 2);
    assert!(matches!(file.error(), Some(Error::ChildOverrun { .. })));

    let file = Mp4File::read_from(&mut Cursor::new(&data), &reg, DecodeOptions::best_effort())?;
    assert_eq!(file.boxes.len(), 2);
    assert!(file.error().is_some());
    Ok(())
}

#[test]
fn stream_reads_only_the_bytes_present() {
    // large-size header claiming 2^46 bytes on a 16-byte stream
    let mut data = 1u32.to_be_bytes().to_vec();
    data.extend_from_slice(b"zzzz");
    data.extend_from_slice(&(1u64 << 46).to_be_bytes());

    let err = read_box_bytes(&mut Cursor::new(&data), 0).unwrap_err();
    assert!(matches!(err, Error::InBox { typ, offset: 0, .. } if typ == FourCC(*b"zzzz")));
    assert!(matches!(err.root(), Error::Truncated { available: 0, .. }));

    let err = Mp4File::read_from(&mut Cursor::new(&data), &default_registry(), DecodeOptions::strict()).unwrap_err();
    assert!(matches!(err.root(), Error::Truncated { .. }));
}

#[test]
fn stream_truncation_names_the_box() -> anyhow::Result<()> {
    let mut data = encode_all(&[&ftyp()]);
    let good_len = data.len() as u64;
    data.extend_from_slice(&100u32.to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&[0; 10]);

    let reg = default_registry();
    let err = Mp4File::read_from(&mut Cursor::new(&data), &reg, DecodeOptions::strict()).unwrap_err();
    assert!(matches!(err, Error::InBox { typ, offset, .. } if typ == FourCC(*b"mdat") && offset == good_len));
    assert!(matches!(
        err.root(),
        Error::Truncated {
            needed: 92,
            available: 10,
            ..
        }
    ));
    assert!(err.to_string().starts_with(&format!("box 'mdat' at offset {good_len}: truncated")));

    // a header cut short is still reported as a header failure
    let err = read_box_bytes(&mut Cursor::new(&data[..5]), 0).unwrap_err();
    assert!(matches!(err, Error::InHeader { offset: 0, .. }));
    assert!(matches!(err.root(), Error::Truncated { needed: 8, available: 5, .. }));

    let file = Mp4File::read_from(&mut Cursor::new(&data), &reg, DecodeOptions::best_effort())?;
    assert_eq!(file.boxes.len(), 1);
    assert!(matches!(file.error().map(Error::root), Some(Error::Truncated { .. })));
    Ok(())
}
