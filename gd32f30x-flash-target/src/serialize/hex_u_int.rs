use serde::{de, Deserializer, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Unsigned integers that can be written as hex.
pub(crate) trait HexUInt: Copy + fmt::LowerHex + Into<u64> + TryFrom<u64> {}

impl HexUInt for u8 {}
impl HexUInt for u16 {}
impl HexUInt for u32 {}
impl HexUInt for u64 {}

pub(crate) fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: HexUInt,
{
    if serializer.is_human_readable() {
        serializer.serialize_str(&format!("{:#x}", value))
    } else {
        serializer.serialize_u64((*value).into())
    }
}

pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: HexUInt,
{
    deserializer.deserialize_any(HexVisitor(PhantomData))
}

struct HexVisitor<T>(PhantomData<T>);

impl<T: HexUInt> HexVisitor<T> {
    fn narrow<E: de::Error>(value: u64) -> Result<T, E> {
        T::try_from(value)
            .map_err(|_| E::custom(format_args!("{value:#x} does not fit the target integer")))
    }
}

impl<'de, T: HexUInt> de::Visitor<'de> for HexVisitor<T> {
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an unsigned integer or a hex string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<T, E> {
        Self::narrow(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<T, E> {
        let value = u64::try_from(value).map_err(|_| E::custom("negative value"))?;
        Self::narrow(value)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
        // parse_int negates after parsing, which underflows for unsigned types.
        if value.trim_start().starts_with('-') {
            return Err(E::custom("negative value"));
        }
        let value = parse_int::parse::<u64>(value).map_err(E::custom)?;
        Self::narrow(value)
    }
}
