use super::hex_u_int;
use serde::{ser::SerializeStruct, Deserialize, Deserializer, Serializer};
use std::ops::Range;

pub(crate) fn serialize<S>(range: &Range<u32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let human_readable = serializer.is_human_readable();
    let mut state = serializer.serialize_struct("Range", 2)?;
    if human_readable {
        state.serialize_field("start", &format!("{:#x}", range.start))?;
        state.serialize_field("end", &format!("{:#x}", range.end))?;
    } else {
        state.serialize_field("start", &range.start)?;
        state.serialize_field("end", &range.end)?;
    }
    state.end()
}

#[derive(Deserialize)]
struct HexRange {
    #[serde(with = "hex_u_int")]
    start: u32,
    #[serde(with = "hex_u_int")]
    end: u32,
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Range<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let HexRange { start, end } = HexRange::deserialize(deserializer)?;
    Ok(start..end)
}
