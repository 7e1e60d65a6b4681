use mp4codec::kinds::*;
use mp4codec::{
    ChildLookup, Error, FourCC, FullBoxHeader, InfoLevels, Mp4Box, default_registry, encode_box, summarize,
};

fn stbl() -> ContainerBox {
    let avc1 = VisualSampleEntryBox::new(FourCC(*b"avc1"), 640, 480)
        .with_child(UnknownBox::new(FourCC(*b"avcC"), vec![1, 0x64, 0, 0x1f, 0xff]));
    let mut stsd = StsdBox::default();
    stsd.add_entry(Box::new(avc1));

    ContainerBox::new(FourCC(*b"stbl"))
        .with_child(stsd)
        .with_child(SttsBox {
            entries: vec![SttsEntry {
                sample_count: 2,
                sample_delta: 3000,
            }],
            ..Default::default()
        })
        .with_child(CttsBox {
            full: FullBoxHeader::new(1, 0),
            entries: vec![
                CttsEntry {
                    sample_count: 1,
                    sample_offset: 3000,
                },
                CttsEntry {
                    sample_count: 1,
                    sample_offset: -3000,
                },
            ],
        })
        .with_child(StscBox {
            entries: vec![StscEntry {
                first_chunk: 1,
                samples_per_chunk: 2,
                sample_description_index: 1,
            }],
            ..Default::default()
        })
        .with_child(StszBox::with_sizes(vec![100, 50]))
        .with_child(StcoBox {
            chunk_offsets: vec![48],
            ..Default::default()
        })
        .with_child(StssBox {
            sample_numbers: vec![1],
            ..Default::default()
        })
}

fn video_moov() -> ContainerBox {
    let tkhd = TkhdBox {
        width: 640 << 16,
        height: 480 << 16,
        ..TkhdBox::new(1, 2000)
    };
    let elst = ElstBox {
        entries: vec![ElstEntry {
            segment_duration: 2000,
            media_time: 0,
            media_rate_integer: 1,
            media_rate_fraction: 0,
        }],
        ..Default::default()
    };
    let minf = ContainerBox::new(FourCC(*b"minf"))
        .with_child(VmhdBox::default())
        .with_child(ContainerBox::new(FourCC(*b"dinf")).with_child(DrefBox::default()))
        .with_child(stbl());
    let mdia = ContainerBox::new(FourCC(*b"mdia"))
        .with_child(MdhdBox::new(90000, 180000, "und").unwrap())
        .with_child(HdlrBox::new(FourCC(*b"vide"), "VideoHandler"))
        .with_child(minf);
    let trak = ContainerBox::new(FourCC(*b"trak"))
        .with_child(tkhd)
        .with_child(ContainerBox::new(FourCC(*b"edts")).with_child(elst))
        .with_child(mdia);

    ContainerBox::new(FourCC(*b"moov"))
        .with_child(MvhdBox::new(1000, 2000, 2))
        .with_child(trak)
}

fn moof(sequence_number: u32, decode_time: u64) -> ContainerBox {
    let tfhd = TfhdBox {
        default_sample_duration: Some(1024),
        default_sample_flags: Some(0x0101_0000),
        ..TfhdBox::new(1)
    };
    let trun = TrunBox {
        full: FullBoxHeader::new(1, TRUN_SAMPLE_SIZE | TRUN_SAMPLE_COMPOSITION_TIME_OFFSET),
        data_offset: Some(0),
        first_sample_flags: Some(0x0200_0000),
        samples: vec![
            TrunSample {
                size: 700,
                composition_time_offset: 1024,
                ..Default::default()
            },
            TrunSample {
                size: 300,
                composition_time_offset: -512,
                ..Default::default()
            },
        ],
    };
    let traf = ContainerBox::new(FourCC(*b"traf"))
        .with_child(tfhd)
        .with_child(TfdtBox::new(decode_time))
        .with_child(trun);
    ContainerBox::new(FourCC(*b"moof"))
        .with_child(MfhdBox::new(sequence_number))
        .with_child(traf)
}

#[test]
fn built_tree_round_trips() -> anyhow::Result<()> {
    let moov = video_moov();
    let bytes = encode_box(&moov)?;
    assert_eq!(bytes.len() as u64, moov.size());

    let decoded = default_registry().decode_all(&bytes)?;
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].downcast_ref::<ContainerBox>(), Some(&moov));
    assert_eq!(encode_box(decoded[0].as_ref())?, bytes);
    Ok(())
}

#[test]
fn fragment_round_trips() -> anyhow::Result<()> {
    let moof = moof(7, 1 << 33);
    let bytes = encode_box(&moof)?;
    let decoded = default_registry().decode_all(&bytes)?;
    let back = decoded[0].downcast_ref::<ContainerBox>().expect("moof container");
    assert_eq!(back, &moof);

    let traf = back.child::<ContainerBox>().expect("traf");
    let tfhd = traf.child::<TfhdBox>().expect("tfhd");
    assert_eq!(
        tfhd.flags(),
        TFHD_DEFAULT_BASE_IS_MOOF | TFHD_DEFAULT_SAMPLE_DURATION | TFHD_DEFAULT_SAMPLE_FLAGS
    );
    assert_eq!(traf.child::<TfdtBox>().map(|t| t.full.version), Some(1));
    let trun = traf.child::<TrunBox>().expect("trun");
    assert_eq!(trun.sample_count(), 2);
    assert_eq!(trun.duration(1024), 2048);
    assert_eq!(trun.samples[1].composition_time_offset, -512);
    Ok(())
}

#[test]
fn sidx_packs_reference_bits() -> anyhow::Result<()> {
    let sidx = SidxBox {
        full: FullBoxHeader::default(),
        reference_id: 1,
        timescale: 90000,
        earliest_presentation_time: 0,
        first_offset: 0,
        references: vec![SidxReference {
            reference_type: true,
            referenced_size: 1234,
            subsegment_duration: 180000,
            starts_with_sap: true,
            sap_type: 1,
            sap_delta_time: 5,
        }],
    };
    let bytes = encode_box(&sidx)?;
    assert_eq!(bytes.len(), 44);
    assert_eq!(&bytes[32..36], &(0x8000_0000u32 | 1234).to_be_bytes());
    assert_eq!(&bytes[40..44], &(0x9000_0005u32).to_be_bytes());

    let decoded = default_registry().decode_all(&bytes)?;
    assert_eq!(decoded[0].downcast_ref::<SidxBox>(), Some(&sidx));
    Ok(())
}

#[test]
fn empty_container_is_header_only() -> anyhow::Result<()> {
    let moov = ContainerBox::new(FourCC(*b"moov"));
    assert_eq!(moov.size(), 8);
    let bytes = encode_box(&moov)?;
    assert_eq!(bytes, [0, 0, 0, 8, b'm', b'o', b'o', b'v']);

    let decoded = default_registry().decode_all(&bytes)?;
    assert!(decoded[0].children().is_empty());
    Ok(())
}

#[test]
fn child_overrunning_parent_is_rejected() {
    let mut bytes = 24u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(b"moov");
    bytes.extend_from_slice(&32u32.to_be_bytes());
    bytes.extend_from_slice(b"free");
    bytes.extend_from_slice(&[0; 8]);

    let err = default_registry().decode_all(&bytes).unwrap_err();
    assert!(matches!(
        err.root(),
        Error::ChildOverrun {
            size: 32,
            offset: 8,
            end: 24,
            ..
        }
    ));
}

#[test]
fn typed_child_lookup() {
    let moov = video_moov();
    assert_eq!(moov.child::<MvhdBox>().map(|m| m.timescale), Some(1000));

    let trak = moov.child::<ContainerBox>().expect("trak");
    assert_eq!(trak.typ, FourCC(*b"trak"));
    assert!(trak.child_by_type(FourCC(*b"edts")).is_some());
    assert_eq!(trak.children_of::<ContainerBox>().count(), 2);
    assert!(trak.child::<MdhdBox>().is_none());

    let mdia = trak.children_of::<ContainerBox>().find(|c| c.typ == FourCC(*b"mdia")).expect("mdia");
    assert_eq!(mdia.child::<MdhdBox>().map(|m| m.language()), Some("und".to_string()));
}

#[test]
fn size_follows_edits() -> anyhow::Result<()> {
    let mut moov = video_moov();
    let before = moov.size();
    moov.add_child(Box::new(FreeBox::zeroed(8)));
    assert_eq!(moov.size(), before + 16);

    let mvhd = moov.children[0].downcast_mut::<MvhdBox>().expect("mvhd");
    mvhd.full = FullBoxHeader::new(1, 0);
    mvhd.duration = 1 << 40;
    assert_eq!(moov.size(), before + 16 + 12);
    assert_eq!(encode_box(&moov)?.len() as u64, moov.size());
    Ok(())
}

#[test]
fn clones_are_deep() {
    let moov = video_moov();
    let mut copy = moov.clone();
    assert_eq!(copy, moov);
    copy.children[0]
        .downcast_mut::<MvhdBox>()
        .expect("mvhd")
        .timescale = 48000;
    assert_ne!(copy, moov);
    assert_eq!(moov.child::<MvhdBox>().map(|m| m.timescale), Some(1000));
}

fn sidx_v0(earliest_presentation_time: u64, reference: SidxReference) -> SidxBox {
    SidxBox {
        full: FullBoxHeader::default(),
        reference_id: 1,
        timescale: 1000,
        earliest_presentation_time,
        first_offset: 0,
        references: vec![reference],
    }
}

#[test]
fn version0_overflow_is_refused() -> anyhow::Result<()> {
    let mut mvhd = MvhdBox::new(1000, 2000, 2);
    mvhd.duration = 1 << 33;
    assert!(encode_box(&mvhd).is_err());

    let entry = ElstEntry {
        segment_duration: 1 << 33,
        media_time: 0,
        media_rate_integer: 1,
        media_rate_fraction: 0,
    };
    let mut elst = ElstBox {
        entries: vec![entry],
        ..Default::default()
    };
    assert!(encode_box(&elst).is_err());
    elst.entries[0] = ElstEntry {
        segment_duration: 10,
        media_time: i64::from(i32::MAX) + 1,
        ..entry
    };
    assert!(encode_box(&elst).is_err());
    elst.full = FullBoxHeader::new(1, 0);
    let decoded = default_registry().decode_all(&encode_box(&elst)?)?;
    assert_eq!(decoded[0].downcast_ref::<ElstBox>(), Some(&elst));

    let reference = SidxReference {
        reference_type: false,
        referenced_size: 100,
        subsegment_duration: 1000,
        starts_with_sap: true,
        sap_type: 1,
        sap_delta_time: 0,
    };
    assert!(encode_box(&sidx_v0(1 << 32, reference)).is_err());
    let mut sidx = sidx_v0(0, reference);
    sidx.first_offset = 1 << 32;
    assert!(encode_box(&sidx).is_err());
    let too_big = SidxReference {
        referenced_size: 0x8000_0000,
        ..reference
    };
    assert!(encode_box(&sidx_v0(0, too_big)).is_err());
    let too_late = SidxReference {
        sap_delta_time: 0x1000_0000,
        ..reference
    };
    assert!(encode_box(&sidx_v0(0, too_late)).is_err());

    let mehd = MehdBox {
        full: FullBoxHeader::default(),
        fragment_duration: 1 << 32,
    };
    assert!(encode_box(&mehd).is_err());

    let tfdt = TfdtBox {
        full: FullBoxHeader::default(),
        base_media_decode_time: 1 << 32,
    };
    assert!(encode_box(&tfdt).is_err());
    Ok(())
}

#[test]
fn info_levels_select_detail() -> anyhow::Result<()> {
    let moov = video_moov();

    let mut out = Vec::new();
    moov.info(&mut out, &InfoLevels::new(), "", "  ")?;
    let text = String::from_utf8(out)?;
    assert!(text.starts_with(&format!("[moov] size={}\n", moov.size())));
    assert!(text.contains("\n  [mvhd] size=108 version=0 flags=000000\n"));
    assert!(text.contains("\n          [stts] size="));
    assert!(!text.contains("entry[1]: count=2 delta=3000"));

    let mut out = Vec::new();
    moov.info(&mut out, &"stts:1".parse::<InfoLevels>()?, "", "  ")?;
    let text = String::from_utf8(out)?;
    assert!(text.contains("entry[1]: count=2 delta=3000"));
    Ok(())
}

#[test]
fn empty_name_without_terminator_stays_empty() -> anyhow::Result<()> {
    let hdlr = HdlrBox {
        lacks_zero_termination: true,
        ..HdlrBox::new(FourCC(*b"soun"), "")
    };
    let bytes = encode_box(&hdlr)?;
    assert_eq!(bytes.len(), 32);
    let decoded = default_registry().decode_all(&bytes)?;
    assert_eq!(decoded[0].downcast_ref::<HdlrBox>(), Some(&hdlr));

    let terminated = HdlrBox::new(FourCC(*b"soun"), "");
    let bytes = encode_box(&terminated)?;
    assert_eq!(bytes.len(), 33);
    assert_eq!(bytes[32], 0);
    let decoded = default_registry().decode_all(&bytes)?;
    assert_eq!(decoded[0].downcast_ref::<HdlrBox>(), Some(&terminated));
    Ok(())
}

#[test]
fn uuid_box_keeps_user_type() -> anyhow::Result<()> {
    let user_type: [u8; 16] = *b"0123456789abcdef";
    let mut bytes = 28u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(b"uuid");
    bytes.extend_from_slice(&user_type);
    bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

    let decoded = default_registry().decode_all(&bytes)?;
    let uuid = decoded[0].downcast_ref::<UuidBox>().expect("uuid box");
    assert_eq!(uuid.user_type, user_type);
    assert_eq!(uuid.payload, [0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(encode_box(decoded[0].as_ref())?, bytes);
    Ok(())
}

fn audio_moov() -> ContainerBox {
    let mp4a = AudioSampleEntryBox::new(FourCC(*b"mp4a"), 2, 48000)
        .with_child(UnknownBox::new(FourCC(*b"esds"), vec![0, 0, 0, 0, 3, 0x19]));
    let mut stsd = StsdBox::default();
    stsd.add_entry(Box::new(mp4a));
    let stbl = ContainerBox::new(FourCC(*b"stbl"))
        .with_child(stsd)
        .with_child(StszBox::with_sizes(vec![371, 372]))
        .with_child(Co64Box {
            chunk_offsets: vec![1 << 33, (1 << 33) + 743],
            ..Default::default()
        });

    let mut dref = DrefBox::default();
    dref.children.push(Box::new(UrlBox {
        full: FullBoxHeader::default(),
        location: Some("http://example.com/audio.mp4".to_string()),
    }));
    let minf = ContainerBox::new(FourCC(*b"minf"))
        .with_child(SmhdBox::default())
        .with_child(ContainerBox::new(FourCC(*b"dinf")).with_child(dref))
        .with_child(stbl);
    let mdia = ContainerBox::new(FourCC(*b"mdia"))
        .with_child(HdlrBox::new(FourCC(*b"soun"), "SoundHandler"))
        .with_child(minf);

    let meta_children: Vec<Box<dyn Mp4Box>> = vec![Box::new(HdlrBox::new(FourCC(*b"mdir"), ""))];
    let meta = MetaBox {
        full: FullBoxHeader::default(),
        children: meta_children,
    };

    ContainerBox::new(FourCC(*b"moov"))
        .with_child(ContainerBox::new(FourCC(*b"udta")).with_child(meta))
        .with_child(ContainerBox::new(FourCC(*b"trak")).with_child(mdia))
        .with_child(ContainerBox::new(FourCC(*b"mvex")).with_child(MehdBox {
            full: FullBoxHeader::new(1, 0),
            fragment_duration: 1 << 35,
        }))
}

#[test]
fn audio_track_round_trips() -> anyhow::Result<()> {
    let moov = audio_moov();
    let bytes = encode_box(&moov)?;
    assert_eq!(bytes.len() as u64, moov.size());

    let decoded = default_registry().decode_all(&bytes)?;
    let back = decoded[0].downcast_ref::<ContainerBox>().expect("moov");
    assert_eq!(back, &moov);
    assert_eq!(encode_box(back)?, bytes);

    let mvex = back.children_of::<ContainerBox>().find(|c| c.typ == FourCC(*b"mvex")).expect("mvex");
    assert_eq!(mvex.child::<MehdBox>().map(|m| m.fragment_duration), Some(1 << 35));
    // v1 mehd: header (8) + full box header (4) + 64-bit duration
    assert_eq!(mvex.child::<MehdBox>().map(|m| m.size()), Some(20));

    // moov(8) udta(8) meta(8 + 4): the meta child starts 28 bytes in
    let outline = summarize(&decoded, 0, None);
    let meta = &outline[0].children[0].children[0];
    assert_eq!((meta.typ.as_str(), meta.offset), ("meta", 16));
    assert_eq!((meta.children[0].typ.as_str(), meta.children[0].offset), ("hdlr", 28));
    assert_eq!(&bytes[32..36], b"hdlr");
    Ok(())
}

#[test]
fn url_location_is_kept() -> anyhow::Result<()> {
    let url = UrlBox {
        full: FullBoxHeader::default(),
        location: Some("file.mp4".to_string()),
    };
    let bytes = encode_box(&url)?;
    assert_eq!(bytes.len(), 12 + 9);
    assert_eq!(&bytes[12..], b"file.mp4\0");
    let decoded = default_registry().decode_all(&bytes)?;
    let back = decoded[0].downcast_ref::<UrlBox>().expect("url box");
    assert!(!back.is_self_contained());
    assert_eq!(back, &url);
    Ok(())
}

#[test]
fn nonzero_sound_version_is_rejected() -> anyhow::Result<()> {
    let mut bytes = encode_box(&AudioSampleEntryBox::new(FourCC(*b"mp4a"), 2, 44100))?;
    // header (8) + reserved (6) + data reference index (2)
    bytes[16..18].copy_from_slice(&1u16.to_be_bytes());
    let err = default_registry().decode_all(&bytes).unwrap_err();
    assert!(matches!(err.root(), Error::UnsupportedVersion { version: 1 }));
    Ok(())
}

#[test]
fn non_utf8_names_round_trip() -> anyhow::Result<()> {
    // 0x8e is an e-acute in Mac Roman and not valid UTF-8
    let mut bytes = 34u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(b"hdlr");
    bytes.extend_from_slice(&[0; 8]);
    bytes.extend_from_slice(b"soun");
    bytes.extend_from_slice(&[0; 12]);
    bytes.extend_from_slice(&[0x8e, 0]);

    let decoded = default_registry().decode_all(&bytes)?;
    let hdlr = decoded[0].downcast_ref::<HdlrBox>().expect("hdlr");
    assert_eq!(hdlr.name, [0x8e]);
    assert_eq!(encode_box(hdlr)?, bytes);

    let mut out = Vec::new();
    hdlr.info(&mut out, &InfoLevels::new(), "", "  ")?;
    assert!(String::from_utf8(out)?.contains("handlerName: \"\u{fffd}\""));

    let avc1 = VisualSampleEntryBox {
        compressor_name: vec![b'x', 0xa5, 0xff],
        ..VisualSampleEntryBox::new(FourCC(*b"avc1"), 320, 240)
    };
    let bytes = encode_box(&avc1)?;
    let decoded = default_registry().decode_all(&bytes)?;
    assert_eq!(decoded[0].downcast_ref::<VisualSampleEntryBox>(), Some(&avc1));
    Ok(())
}

#[test]
fn trun_without_sample_fields_bounds_the_count() -> anyhow::Result<()> {
    let mut bytes = 16u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(b"trun");
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&u32::MAX.to_be_bytes());
    let err = default_registry().decode_all(&bytes).unwrap_err();
    assert!(matches!(err.root(), Error::InvalidData(_)));

    bytes[12..16].copy_from_slice(&3u32.to_be_bytes());
    let decoded = default_registry().decode_all(&bytes)?;
    let trun = decoded[0].downcast_ref::<TrunBox>().expect("trun");
    assert_eq!(trun.sample_count(), 3);
    assert_eq!(trun.duration(1024), 3072);
    assert_eq!(encode_box(trun)?, bytes);
    Ok(())
}
