use std::io::Write;

use error_stack::{Result, ResultExt};
use serde::Serialize;

use crate::Error;

/// Writes `value` as a single line of JSON.
pub fn print<W, T>(out: &mut W, value: &T) -> Result<(), Error>
where
    W: Write,
    T: Serialize + ?Sized,
{
    serde_json::to_writer(&mut *out, value).change_context(Error::Output)?;
    writeln!(out).change_context(Error::Output)?;
    out.flush().change_context(Error::Output)
}

/// Serializes raw bytes the way the protobuf JSON mapping does, as standard base64.
pub mod as_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::Serializer;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }
}
