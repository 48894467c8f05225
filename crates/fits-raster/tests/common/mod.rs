#![allow(dead_code)]

use fits_stream::block::padded_byte_len;
use fits_stream::card::serialize_header;
use fits_stream::sample::encode_f32;
use fits_stream::{Card, Value};

pub fn card(name: &str, value: Value) -> Card {
    Card::new(name, value, None).unwrap()
}

fn layout_cards(first: Card, bitpix: i64, naxes: &[usize]) -> Vec<Card> {
    let mut cards = vec![
        first,
        card("BITPIX", Value::Integer(bitpix)),
        card("NAXIS", Value::Integer(naxes.len() as i64)),
    ];
    for (i, &n) in naxes.iter().enumerate() {
        cards.push(card(&format!("NAXIS{}", i + 1), Value::Integer(n as i64)));
    }
    cards
}

fn with_data(cards: &[Card], data: &[u8]) -> Vec<u8> {
    let mut out = serialize_header(cards);
    out.extend_from_slice(data);
    out.resize(padded_byte_len(out.len()), 0);
    out
}

/// A primary HDU with big-endian `data` and any extra header cards.
pub fn primary(bitpix: i64, naxes: &[usize], extra: &[Card], data: &[u8]) -> Vec<u8> {
    let mut cards = layout_cards(card("SIMPLE", Value::Logical(true)), bitpix, naxes);
    cards.extend_from_slice(extra);
    with_data(&cards, data)
}

/// An 8-bit IMAGE extension, optionally named.
pub fn image_extension(name: Option<&str>, naxes: &[usize]) -> Vec<u8> {
    let mut cards = layout_cards(card("XTENSION", Value::String(String::from("IMAGE"))), 8, naxes);
    cards.push(card("PCOUNT", Value::Integer(0)));
    cards.push(card("GCOUNT", Value::Integer(1)));
    if let Some(name) = name {
        cards.push(card("EXTNAME", Value::String(String::from(name))));
    }
    let len: usize = naxes.iter().product();
    with_data(&cards, &vec![7u8; len])
}

pub fn f32_data(values: &[f32]) -> Vec<u8> {
    encode_f32(values)
}

pub fn i16_data(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn i32_data(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn f64_data(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < 1e-6, "sample {i}: {a} != {e}");
    }
}
