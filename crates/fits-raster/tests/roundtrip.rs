//! Decode, save and decode again, through the session the way a host drives it.

mod common;

use std::collections::BTreeMap;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::ops::ControlFlow;

use common::{card, f32_data, i16_data, image_extension, primary};
use fits_raster::{
    decode, encode, CodecError, HeaderMetadata, Keyword, NoProgress, PixelBuffer, RasterImage, ScanlineSource,
    Session,
};
use fits_stream::{Card, FitsReader, Value, BLOCK_SIZE};

fn annotated_float_file() -> Vec<u8> {
    let extra = [
        Card::new("OBJECT", Value::String(String::from("M 42")), Some("target name")).unwrap(),
        card("EXPTIME", Value::Float(30.5)),
        card("NCOMBINE", Value::Integer(12)),
        card("DARKSUB", Value::Logical(true)),
        card("FLATCOR", Value::Logical(false)),
        card("OBSERVER", Value::String(String::from("O'Brien"))),
        Card::commentary("HISTORY", "stacked from 12 frames").unwrap(),
        Card::commentary("COMMENT", "calibrated").unwrap(),
    ];
    let values: Vec<f32> = (0..6).map(|i| i as f32 / 5.0).collect();
    primary(-32, &[3, 2], &extra, &f32_data(&values))
}

fn replayable(meta: &HeaderMetadata) -> BTreeMap<String, Keyword> {
    meta.replayable_keywords()
        .map(|(name, kw)| (name.to_string(), kw.clone()))
        .collect()
}

fn save(session: &Session, raster: &RasterImage) -> Vec<u8> {
    session
        .write(Cursor::new(Vec::new()), raster, &mut NoProgress)
        .unwrap()
        .into_inner()
}

#[test]
fn float_image_and_header_survive_a_save() {
    let mut session = Session::default();
    let raster = session
        .read(Cursor::new(annotated_float_file()), &mut NoProgress)
        .unwrap();
    let before = session.metadata().unwrap().clone();
    session
        .options(raster.planes(), &mut |_: &str| -> bool { panic!("no warning expected") })
        .unwrap();

    let bytes = save(&session, &raster);
    assert_eq!(bytes.len() % BLOCK_SIZE, 0);

    let again = decode(Cursor::new(bytes), &mut NoProgress).unwrap();
    assert_eq!(again.raster.buffer(), raster.buffer());
    assert_eq!(again.raster.planes(), 1);
    assert_eq!(replayable(&again.metadata), replayable(&before));
    assert_eq!(again.metadata.commentary, before.commentary);
    assert_eq!(
        again.metadata.keyword("OBJECT").unwrap().comment.as_deref(),
        Some("target name")
    );
    assert_eq!(again.metadata.keyword("NAXIS").unwrap().value, Value::Integer(3));
}

#[test]
fn non_ascii_and_unquoted_values_survive_repeated_saves() {
    let extra = [
        card("OBSERVER", Value::String(String::from("Müller"))),
        // unquoted date, as some acquisition software writes it
        Card {
            keyword: *b"DATE-OBS",
            value: None,
            comment: Some(String::from("= 2024-01-01")),
        },
    ];
    let file = primary(-32, &[2, 1], &extra, &f32_data(&[0.0, 1.0]));

    let mut session = Session::default();
    let mut raster = session.read(Cursor::new(file), &mut NoProgress).unwrap();
    for _ in 0..2 {
        let meta = session.metadata().unwrap();
        assert_eq!(
            meta.keyword("OBSERVER").unwrap().value,
            Value::String(String::from("Müller"))
        );
        assert_eq!(
            meta.keyword("DATE-OBS").unwrap().value,
            Value::String(String::from("2024-01-01"))
        );
        let bytes = save(&session, &raster);
        raster = session.read(Cursor::new(bytes), &mut NoProgress).unwrap();
    }
}

#[test]
fn booleans_are_written_as_logical_literals() {
    let mut session = Session::default();
    let raster = session
        .read(Cursor::new(annotated_float_file()), &mut NoProgress)
        .unwrap();
    let bytes = save(&session, &raster);
    let text = String::from_utf8_lossy(&bytes[..BLOCK_SIZE]).into_owned();

    assert!(text.contains(&format!("DARKSUB = {:>20}", "T")));
    assert!(text.contains(&format!("FLATCOR = {:>20}", "F")));

    let reader = FitsReader::open(Cursor::new(bytes)).unwrap();
    let darksub = reader.cards().iter().find(|c| c.name() == "DARKSUB").unwrap();
    assert_eq!(darksub.value, Some(Value::Logical(true)));
}

#[test]
fn layout_keywords_come_from_the_new_image() {
    let extra = [card("BSCALE", Value::Float(1.0)), card("BZERO", Value::Float(32768.0))];
    let file = primary(16, &[2, 1], &extra, &i16_data(&[-32768, 32767]));
    let mut session = Session::default();
    let raster = session.read(Cursor::new(file), &mut NoProgress).unwrap();

    let bytes = save(&session, &raster);
    let reader = FitsReader::open(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.image().bitpix, -32);
    assert_eq!(reader.image().naxes, vec![2, 1, 1]);
    assert!(reader.image().scaling.is_identity());
}

#[test]
fn bytes_are_saved_as_byte_image() {
    let data = [0u8, 10, 20, 30, 40, 50, 60, 70, 80];
    let file = primary(8, &[3, 1, 3], &[card("ORIGIN", Value::String(String::from("lab")))], &data);
    let mut session = Session::default();
    let raster = session.read(Cursor::new(file), &mut NoProgress).unwrap();
    assert_eq!(session.estimate(&raster), 9);

    let bytes = save(&session, &raster);
    let again = decode(Cursor::new(bytes), &mut NoProgress).unwrap();
    assert_eq!(again.metadata.bitpix, 8);
    assert_eq!(again.raster.buffer(), &PixelBuffer::Bytes(data.to_vec()));
    assert_eq!(
        again.metadata.keyword("ORIGIN").unwrap().value,
        Value::String(String::from("lab"))
    );
}

struct Ramp16 {
    rows: Vec<Vec<u8>>,
}

impl Ramp16 {
    fn new(samples: &[u16]) -> Self {
        let row: Vec<u8> = samples.iter().flat_map(|v| v.to_ne_bytes()).collect();
        Ramp16 { rows: vec![row] }
    }
}

impl ScanlineSource for Ramp16 {
    fn width(&self) -> usize {
        self.rows[0].len() / 2
    }
    fn height(&self) -> usize {
        1
    }
    fn planes(&self) -> usize {
        1
    }
    fn bits_per_channel(&self) -> u32 {
        16
    }
    fn scanline(&self, _plane: usize, row: usize) -> &[u8] {
        &self.rows[row]
    }
}

#[test]
fn sixteen_bit_hosts_write_unsigned_short() {
    let source = Ramp16::new(&[0, 1000, 65535]);
    let bytes = encode(Cursor::new(Vec::new()), &source, None, &mut NoProgress)
        .unwrap()
        .into_inner();

    let mut reader = FitsReader::open(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.image().bitpix, 16);
    assert_eq!(reader.image().scaling.bzero, 32768.0);
    let mut physical = [0f32; 3];
    reader.read_f32(0, &mut physical).unwrap();
    assert_eq!(physical, [0.0, 1000.0, 65535.0]);
}

#[test]
fn declining_the_warning_cancels_the_save() {
    let mut file = primary(16, &[2, 1], &[], &i16_data(&[0, 4]));
    file.extend(image_extension(Some("WEIGHTS"), &[2, 1]));
    let mut session = Session::default();
    let raster = session.read(Cursor::new(file), &mut NoProgress).unwrap();

    let mut shown = None;
    let err = session
        .options(raster.planes(), &mut |message: &str| {
            shown = Some(message.to_string());
            false
        })
        .unwrap_err();
    assert!(matches!(err, CodecError::UserCancelled));
    let shown = shown.unwrap();
    assert!(shown.contains("16-bit integer"));
    assert!(shown.contains("In addition, the original FITS file contained extra data in an extension named 'WEIGHTS'"));
}

#[test]
fn extension_contents_are_not_written() {
    let mut file = primary(-32, &[2, 1], &[], &f32_data(&[0.0, 1.0]));
    file.extend(image_extension(Some("MASK"), &[2, 1]));
    let mut session = Session::default();
    let raster = session.read(Cursor::new(file), &mut NoProgress).unwrap();
    session.options(raster.planes(), &mut |_: &str| true).unwrap();

    let bytes = save(&session, &raster);
    assert_eq!(bytes.len(), 2 * BLOCK_SIZE);
    let again = decode(Cursor::new(bytes), &mut NoProgress).unwrap();
    assert!(again.metadata.extension_names.is_empty());
}

#[test]
fn cancel_mid_encode_leaves_file_unfinished() {
    let values = [0.5f32; 16];
    let raster = RasterImage::from_buffer(4, 4, 1, PixelBuffer::Floats(values.to_vec())).unwrap();
    let mut out = Cursor::new(Vec::new());
    let mut hook = |done: u64, total: u64| {
        assert_eq!(total, 4);
        if done >= 2 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    };

    let err = encode(&mut out, &raster, None, &mut hook).unwrap_err();
    assert!(matches!(err, CodecError::Cancelled));
    let partial = out.into_inner();
    assert_eq!(partial.len(), BLOCK_SIZE + 2 * 4 * 4);
    assert!(matches!(
        decode(Cursor::new(partial), &mut NoProgress),
        Err(CodecError::Decode { .. })
    ));
}

#[test]
fn write_without_metadata_has_only_layout_keywords() {
    let raster = RasterImage::from_buffer(1, 1, 1, PixelBuffer::Bytes(vec![9])).unwrap();
    let session = Session::default();
    let bytes = save(&session, &raster);
    let again = decode(Cursor::new(bytes), &mut NoProgress).unwrap();
    assert_eq!(again.metadata.replayable_keywords().count(), 0);
    assert!(again.metadata.commentary.is_empty());
}

#[test]
fn rewrites_a_stream_that_already_holds_data() {
    let raster = RasterImage::from_buffer(2, 1, 1, PixelBuffer::Bytes(vec![1, 2])).unwrap();
    let mut stream = Cursor::new(Vec::new());
    stream.write_all(&[0xAA; 100]).unwrap();
    stream.seek(SeekFrom::End(0)).unwrap();

    let stream = encode(stream, &raster, None, &mut NoProgress).unwrap();
    let bytes = stream.into_inner();
    assert_eq!(&bytes[..6], b"SIMPLE");
}

#[cfg(unix)]
mod descriptor {
    use super::*;
    use fits_raster::DescriptorStream;
    use std::os::fd::AsFd;

    #[test]
    fn read_and_write_through_host_descriptors() {
        let mut input = tempfile::tempfile().unwrap();
        input.write_all(&annotated_float_file()).unwrap();

        let mut session = Session::default();
        let raster = session
            .read(DescriptorStream::new(input.as_fd()).unwrap(), &mut NoProgress)
            .unwrap();

        let output = tempfile::tempfile().unwrap();
        session
            .write(DescriptorStream::new(output.as_fd()).unwrap(), &raster, &mut NoProgress)
            .unwrap();

        // both host descriptors are still usable
        input.seek(SeekFrom::Start(0)).unwrap();
        let again = session
            .read(DescriptorStream::new(output.as_fd()).unwrap(), &mut NoProgress)
            .unwrap();
        assert_eq!(again.buffer(), raster.buffer());
    }
}
