use std::io;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::block::Block;

/// Leading hex characters a puzzle digest must start with
pub const DIFFICULTY_PREFIX: &str = "0000";

/// Hashes the puzzle difference `a*a - b*b`
///
/// The squares are taken in `i128`, which holds the exact result for every
/// pair of `i64` inputs. The difference is rendered in base 10 (with a
/// leading `-` when negative) and the SHA-256 of that text is returned as
/// 64 lowercase hex characters.
pub fn digest_of_difference(a: i64, b: i64) -> String {
    let a = i128::from(a);
    let b = i128::from(b);
    sha256_hex((a * a - b * b).to_string().as_bytes())
}

/// Hashes the canonical serialization of a block
pub fn digest_of_block(block: &Block) -> String {
    sha256_hex(&canonical_json(block))
}

/// Whether a digest satisfies the proof-of-work puzzle
pub fn meets_difficulty(digest: &str) -> bool {
    digest.starts_with(DIFFICULTY_PREFIX)
}

/// Serializes a value as JSON with object keys sorted by name
///
/// Members are separated by `", "` and keys from values by `": "`, and
/// non-ASCII characters are written as `\uXXXX` escapes. This is the byte
/// format that block digests are computed over.
pub fn canonical_json<T: Serialize>(value: &T) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, CanonicalFormatter);

    // Both steps only fail for non-string map keys or a failing writer,
    // and neither can happen when writing derived structs into memory.
    let value = serde_json::to_value(value).expect("value converts to JSON");
    SortedKeys(&value)
        .serialize(&mut serializer)
        .expect("in-memory JSON write");

    buffer
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Serializes a JSON value with every object's keys in sorted order,
/// whatever order the underlying map keeps them in.
struct SortedKeys<'a>(&'a Value);

impl Serialize for SortedKeys<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|left, right| left.0.cmp(right.0));

                let mut object = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    object.serialize_entry(key, &SortedKeys(value))?;
                }
                object.end()
            }
            Value::Array(items) => serializer.collect_seq(items.iter().map(SortedKeys)),
            other => other.serialize(serializer),
        }
    }
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
