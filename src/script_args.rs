//! VM script argument encoding
//!
//! Script arguments are passed to `vm/MsgExecuteScript` as a list of
//! `{type, value}` pairs where `type` is the numeric VM type id and `value`
//! is the base64 encoding of the argument bytes:
//! - `bool` is a single byte, `1` or `0` (integers pass through as one byte)
//! - `u8`, `u64` and `u128` are fixed-width little-endian integers
//! - `vector` is raw bytes taken from hex, text, a number or a byte list
//! - `address` is the raw account hash behind a bech32 address
//!
//! The numeric ids are part of the VM wire protocol and never change.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::address::address_to_bytes;
use crate::error::ScriptArgError;

/// VM argument type with its stable wire id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TypeTag {
    Bool = 0,
    U64 = 1,
    Vector = 2,
    Address = 3,
    U8 = 4,
    U128 = 5,
}

impl TypeTag {
    /// All tags in wire id order
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Bool,
        TypeTag::U64,
        TypeTag::Vector,
        TypeTag::Address,
        TypeTag::U8,
        TypeTag::U128,
    ];

    /// Numeric id used on the wire
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable type name
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Bool => "bool",
            TypeTag::U64 => "u64",
            TypeTag::Vector => "vector",
            TypeTag::Address => "address",
            TypeTag::U8 => "u8",
            TypeTag::U128 => "u128",
        }
    }

    /// Encoded byte width for fixed-size types
    pub fn width(self) -> Option<usize> {
        match self {
            TypeTag::Bool | TypeTag::U8 => Some(1),
            TypeTag::U64 => Some(8),
            TypeTag::U128 => Some(16),
            TypeTag::Vector | TypeTag::Address => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TypeTag {
    type Err = ScriptArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.name() == s)
            .ok_or_else(|| ScriptArgError::UnsupportedType(s.to_string()))
    }
}

impl From<TypeTag> for u8 {
    fn from(tag: TypeTag) -> u8 {
        tag.code()
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = ScriptArgError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.code() == code)
            .ok_or_else(|| ScriptArgError::UnsupportedType(code.to_string()))
    }
}

/// Source of the bytes for a `vector` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorInput {
    /// Hex string decoded into raw bytes
    Hex(String),
    /// Text taken as its UTF-8 bytes
    Ascii(String),
    /// Number rendered as minimal big-endian bytes
    Numeral(u128),
    /// Bytes used verbatim
    Bytes(Vec<u8>),
}

impl VectorInput {
    /// Pick hex or text for a string.
    ///
    /// A string is hex when reading it as a base-16 number and printing that
    /// number back as minimal lowercase hex gives the same string. Leading
    /// zeros therefore make it text (`"0a"`, `"00ff"`), while odd-length
    /// strings such as `"abc"` are hex and lose their trailing nibble.
    pub fn infer(s: &str) -> Self {
        if is_minimal_hex(s) {
            VectorInput::Hex(s[..s.len() - s.len() % 2].to_string())
        } else {
            VectorInput::Ascii(s.to_string())
        }
    }

    fn into_bytes(self) -> Result<Vec<u8>, ScriptArgError> {
        match self {
            VectorInput::Hex(s) => {
                hex::decode(&s).map_err(|e| ScriptArgError::InvalidHex(format!("{}: {}", s, e)))
            }
            VectorInput::Ascii(s) => Ok(s.into_bytes()),
            VectorInput::Numeral(n) => Ok(trim_leading_zeros(n.to_be_bytes().to_vec())),
            VectorInput::Bytes(bytes) => Ok(bytes),
        }
    }
}

/// Caller-supplied value for a script argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgInput {
    Bool(bool),
    Int(u128),
    /// Decimal or `0x` numerals, `"true"`/`"false"`, addresses, or a vector
    /// string whose kind is inferred
    Text(String),
    Vector(VectorInput),
}

impl From<bool> for ArgInput {
    fn from(b: bool) -> Self {
        ArgInput::Bool(b)
    }
}

impl From<u8> for ArgInput {
    fn from(n: u8) -> Self {
        ArgInput::Int(n.into())
    }
}

impl From<u64> for ArgInput {
    fn from(n: u64) -> Self {
        ArgInput::Int(n.into())
    }
}

impl From<u128> for ArgInput {
    fn from(n: u128) -> Self {
        ArgInput::Int(n)
    }
}

impl From<&str> for ArgInput {
    fn from(s: &str) -> Self {
        ArgInput::Text(s.to_string())
    }
}

impl From<String> for ArgInput {
    fn from(s: String) -> Self {
        ArgInput::Text(s)
    }
}

impl From<Vec<u8>> for ArgInput {
    fn from(bytes: Vec<u8>) -> Self {
        ArgInput::Vector(VectorInput::Bytes(bytes))
    }
}

impl From<VectorInput> for ArgInput {
    fn from(v: VectorInput) -> Self {
        ArgInput::Vector(v)
    }
}

/// Encoded script argument as embedded in `vm/MsgExecuteScript`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptArg {
    /// VM type id
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    /// Base64 of the encoded bytes
    pub value: String,
}

impl ScriptArg {
    /// Decode the base64 value back into bytes
    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.value)
    }
}

/// Build a script argument from a type name such as `"u64"`
pub fn arg(type_name: &str, value: impl Into<ArgInput>) -> Result<ScriptArg, ScriptArgError> {
    let tag = TypeTag::from_str(type_name)?;
    encode(tag, value.into())
}

/// Encode a value for the given VM type
pub fn encode(tag: TypeTag, input: ArgInput) -> Result<ScriptArg, ScriptArgError> {
    let bytes = match tag {
        TypeTag::Bool => bool_to_bytes(input)?,
        TypeTag::U8 | TypeTag::U64 | TypeTag::U128 => {
            let width = tag.width().unwrap_or_default();
            uint_to_bytes(&numeral_to_be_bytes(tag, input)?, width)?
        }
        TypeTag::Vector => vector_to_bytes(input)?,
        TypeTag::Address => match input {
            ArgInput::Text(address) => address_to_bytes(&address)?,
            other => return Err(mismatch(tag, &other)),
        },
    };

    debug!("Encoded {} argument into {} bytes", tag, bytes.len());

    Ok(ScriptArg {
        type_tag: tag,
        value: BASE64.encode(bytes),
    })
}

/// Place a big-endian unsigned integer into a little-endian buffer of `width` bytes
pub fn uint_to_bytes(be_bytes: &[u8], width: usize) -> Result<Vec<u8>, ScriptArgError> {
    let trimmed = trim_leading_zeros(be_bytes.to_vec());
    if trimmed.len() > width {
        return Err(ScriptArgError::Overflow {
            width,
            bytes: trimmed.len(),
        });
    }

    let mut buf = vec![0u8; width];
    for (slot, byte) in buf.iter_mut().zip(trimmed.iter().rev()) {
        *slot = *byte;
    }
    Ok(buf)
}

/// Read a little-endian unsigned integer of at most 16 bytes
pub fn uint_from_le_bytes(bytes: &[u8]) -> Option<u128> {
    if bytes.len() > 16 {
        return None;
    }
    Some(
        bytes
            .iter()
            .rev()
            .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte)),
    )
}

/// Parse a decimal or `0x`-prefixed hex numeral of any size into minimal
/// big-endian bytes
pub fn parse_numeral(numeral: &str) -> Result<Vec<u8>, ScriptArgError> {
    let s = numeral.trim();
    let invalid = || ScriptArgError::InvalidNumeral(numeral.to_string());

    if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if digits.is_empty() {
            return Err(invalid());
        }
        let padded = if digits.len() % 2 == 0 {
            digits.to_string()
        } else {
            format!("0{}", digits)
        };
        let bytes = hex::decode(padded).map_err(|_| invalid())?;
        return Ok(trim_leading_zeros(bytes));
    }

    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let mut acc: Vec<u8> = vec![0];
    for digit in s.bytes().map(|b| u32::from(b - b'0')) {
        let mut carry = digit;
        for byte in acc.iter_mut().rev() {
            let v = u32::from(*byte) * 10 + carry;
            *byte = (v & 0xff) as u8;
            carry = v >> 8;
        }
        while carry > 0 {
            acc.insert(0, (carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    Ok(trim_leading_zeros(acc))
}

// "false" is the only string that means false. Integers are written as a
// single unsigned byte, unchanged.
fn bool_to_bytes(input: ArgInput) -> Result<Vec<u8>, ScriptArgError> {
    let value = match input {
        ArgInput::Bool(b) => u128::from(b),
        ArgInput::Text(s) => u128::from(s != "false"),
        ArgInput::Int(n) => n,
        other => return Err(mismatch(TypeTag::Bool, &other)),
    };
    uint_to_bytes(&value.to_be_bytes(), 1)
}

fn numeral_to_be_bytes(tag: TypeTag, input: ArgInput) -> Result<Vec<u8>, ScriptArgError> {
    match input {
        ArgInput::Int(n) => Ok(trim_leading_zeros(n.to_be_bytes().to_vec())),
        ArgInput::Text(s) => parse_numeral(&s),
        other => Err(mismatch(tag, &other)),
    }
}

fn vector_to_bytes(input: ArgInput) -> Result<Vec<u8>, ScriptArgError> {
    match input {
        ArgInput::Vector(v) => v.into_bytes(),
        ArgInput::Text(s) => VectorInput::infer(&s).into_bytes(),
        ArgInput::Int(n) => VectorInput::Numeral(n).into_bytes(),
        other => Err(mismatch(TypeTag::Vector, &other)),
    }
}

// Arbitrary-precision form of `n.toString(16) == s.toLowerCase()`: only hex
// digits, and no leading zero unless the string is a single "0".
fn is_minimal_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit()) && (s.len() == 1 || !s.starts_with('0'))
}

fn mismatch(tag: TypeTag, input: &ArgInput) -> ScriptArgError {
    ScriptArgError::UnsupportedType(format!("cannot encode {:?} as {}", input, tag))
}

// Keeps at least one byte so zero encodes as [0x00].
fn trim_leading_zeros(mut bytes: Vec<u8>) -> Vec<u8> {
    let first = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    bytes.drain(..first);
    if bytes.is_empty() {
        bytes.push(0);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(arg: &ScriptArg) -> Vec<u8> {
        arg.bytes().unwrap()
    }

    #[test]
    fn test_type_codes_are_stable() {
        let codes: Vec<(&str, u8)> = TypeTag::ALL.iter().map(|t| (t.name(), t.code())).collect();
        assert_eq!(
            codes,
            vec![("bool", 0), ("u64", 1), ("vector", 2), ("address", 3), ("u8", 4), ("u128", 5)]
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert_eq!(
            arg("u32", 1u64),
            Err(ScriptArgError::UnsupportedType("u32".to_string()))
        );
        assert!(TypeTag::try_from(6).is_err());
    }

    #[test]
    fn test_uint_roundtrip_and_width() {
        let cases: [(&str, u128); 5] = [
            ("u8", 0),
            ("u8", 255),
            ("u64", 1_000_000),
            ("u64", u64::MAX as u128),
            ("u128", u128::MAX - 7),
        ];
        for (ty, n) in cases {
            let arg = arg(ty, n).unwrap();
            let bytes = decoded(&arg);
            assert_eq!(bytes.len(), arg.type_tag.width().unwrap());
            assert_eq!(uint_from_le_bytes(&bytes), Some(n));
        }
    }

    #[test]
    fn test_u64_is_little_endian() {
        let arg = arg("u64", "258").unwrap();
        assert_eq!(decoded(&arg), vec![0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(arg.type_tag.code(), 1);
    }

    #[test]
    fn test_overflow() {
        assert_eq!(
            arg("u8", 256u64),
            Err(ScriptArgError::Overflow { width: 1, bytes: 2 })
        );
        assert_eq!(
            arg("u64", "18446744073709551616"),
            Err(ScriptArgError::Overflow { width: 8, bytes: 9 })
        );
        assert_eq!(
            arg("u128", "340282366920938463463374607431768211456"),
            Err(ScriptArgError::Overflow { width: 16, bytes: 17 })
        );
        assert!(arg("u64", "18446744073709551615").is_ok());
    }

    #[test]
    fn test_max_u128() {
        let arg = arg("u128", "340282366920938463463374607431768211455").unwrap();
        assert_eq!(decoded(&arg), vec![0xff; 16]);
        assert_eq!(arg.value, "/////////////////////w==");
    }

    #[test]
    fn test_invalid_numerals() {
        for bad in ["", "-1", "1.5", "1e3", "abc", "0x"] {
            assert!(
                matches!(arg("u64", bad), Err(ScriptArgError::InvalidNumeral(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_hex_numeral() {
        let arg = arg("u64", "0x1ff").unwrap();
        assert_eq!(uint_from_le_bytes(&decoded(&arg)), Some(511));
    }

    #[test]
    fn test_bool_encoding() {
        let t = arg("bool", true).unwrap();
        let f = arg("bool", false).unwrap();
        assert_eq!(decoded(&t), vec![1]);
        assert_eq!(decoded(&f), vec![0]);
        assert_eq!(arg("bool", "false").unwrap(), f);
        assert_eq!(arg("bool", "true").unwrap(), t);
        // Any string other than "false" encodes as true, including "0".
        assert_eq!(arg("bool", "anything").unwrap(), t);
        assert_eq!(arg("bool", "0").unwrap(), t);
    }

    #[test]
    fn test_bool_integer_keeps_its_byte() {
        assert_eq!(decoded(&arg("bool", 5u8).unwrap()), vec![0x05]);
        assert_eq!(decoded(&arg("bool", 0u8).unwrap()), vec![0x00]);
        assert_eq!(
            arg("bool", 256u64),
            Err(ScriptArgError::Overflow { width: 1, bytes: 2 })
        );
    }

    #[test]
    fn test_vector_string_hex_detection() {
        // Leading zeros do not survive the number round trip, so these are text.
        assert_eq!(decoded(&arg("vector", "0a").unwrap()), vec![0x30, 0x61]);
        assert_eq!(decoded(&arg("vector", "00ff").unwrap()), vec![0x30, 0x30, 0x66, 0x66]);
        // Odd-length hex keeps only whole bytes.
        assert_eq!(decoded(&arg("vector", "abc").unwrap()), vec![0xab]);
        assert_eq!(decoded(&arg("vector", "0").unwrap()), Vec::<u8>::new());
        assert_eq!(decoded(&arg("vector", "DeadBeef").unwrap()), vec![0xde, 0xad, 0xbe, 0xef]);
        // Longer than any float can hold.
        let long = "ff".repeat(40);
        assert_eq!(decoded(&arg("vector", long.as_str()).unwrap()), vec![0xff; 40]);
        assert_eq!(VectorInput::infer("12zz"), VectorInput::Ascii("12zz".into()));
        assert_eq!(VectorInput::infer(""), VectorInput::Ascii(String::new()));
    }

    #[test]
    fn test_tagged_hex_is_strict() {
        assert_eq!(
            decoded(&arg("vector", VectorInput::Hex("00ff".into())).unwrap()),
            vec![0x00, 0xff]
        );
        assert!(matches!(
            arg("vector", VectorInput::Hex("abc".into())),
            Err(ScriptArgError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_vector_inputs() {
        assert_eq!(decoded(&arg("vector", "deadbeef").unwrap()), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decoded(&arg("vector", "hello").unwrap()), b"hello".to_vec());
        assert_eq!(decoded(&arg("vector", 0x1234u64).unwrap()), vec![0x12, 0x34]);
        assert_eq!(decoded(&arg("vector", 0u64).unwrap()), vec![0x00]);
        assert_eq!(decoded(&arg("vector", vec![1u8, 2, 3]).unwrap()), vec![1, 2, 3]);
        assert_eq!(
            decoded(&arg("vector", VectorInput::Ascii("cafe".into())).unwrap()),
            b"cafe".to_vec()
        );
    }

    #[test]
    fn test_vector_rejects_bool_and_bad_hex() {
        assert!(matches!(
            arg("vector", true),
            Err(ScriptArgError::UnsupportedType(_))
        ));
        assert!(matches!(
            arg("vector", VectorInput::Hex("xyz".into())),
            Err(ScriptArgError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_address_argument() {
        let arg = arg("address", "wallet12tg20s9g4les55vfvnumlkg0a5zk825py9j0ha").unwrap();
        assert_eq!(arg.type_tag, TypeTag::Address);
        assert_eq!(
            hex::encode(decoded(&arg)),
            "52d0a7c0a8aff30a518964f9bfd90fed0563aa81"
        );
        assert!(matches!(
            encode(TypeTag::Address, ArgInput::Int(5)),
            Err(ScriptArgError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_wire_shape() {
        let arg = arg("u8", 7u8).unwrap();
        let json = serde_json::to_value(&arg).unwrap();
        assert_eq!(json, serde_json::json!({"type": 4, "value": "Bw=="}));
        let back: ScriptArg = serde_json::from_value(json).unwrap();
        assert_eq!(back, arg);
    }
}
