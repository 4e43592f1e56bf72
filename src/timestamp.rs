use std::fmt;
use std::fmt::{Display, Formatter};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcDateTime};

const NANOS_IN_MILLI: i128 = 1_000_000;

/// Milliseconds since the Unix epoch.
///
/// The only time representation the store and the editor work with,
/// whatever the backing store keeps on disk.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    pub fn now() -> Self {
        UtcDateTime::now().into()
    }
}

impl From<UtcDateTime> for Timestamp {
    fn from(value: UtcDateTime) -> Self {
        Timestamp((value.unix_timestamp_nanos() / NANOS_IN_MILLI) as i64)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match OffsetDateTime
            ::from_unix_timestamp_nanos(self.0 as i128 * NANOS_IN_MILLI)
            .ok()
            .and_then(|dt| dt.format(&Rfc3339).ok())
        {
            Some(formatted) => f.write_str(&formatted),
            None => write!(f, "@{}ms", self.0),
        }
    }
}
