/// Request timestamps in RFC1123 form
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// The instant a request is made, in the two shapes the protocol needs
///
/// `header` goes into the signature and the `x-ms-date` header, while
/// `components` build the event identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDate {
    pub header: String,
    pub components: [String; 6],
}

impl RequestDate {
    /// Format a given instant, converted to UTC first
    pub fn at(instant: OffsetDateTime) -> Self {
        let utc = instant.to_offset(UtcOffset::UTC);

        RequestDate {
            header: format_rfc1123(utc),
            components: [
                format!("{:04}", utc.year()),
                format!("{:02}", u8::from(utc.month())),
                format!("{:02}", utc.day()),
                format!("{:02}", utc.hour()),
                format!("{:02}", utc.minute()),
                format!("{:02}", utc.second()),
            ],
        }
    }

    /// Timestamp from the system clock
    pub fn now() -> Self {
        Self::at(OffsetDateTime::now_utc())
    }

    /// Components joined as `YYYY-MM-DD-HH-mm-ss`
    pub fn joined(&self) -> String {
        self.components.join("-")
    }
}

fn format_rfc1123(utc: OffsetDateTime) -> String {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    utc.format(&format).unwrap_or_else(|_| utc.to_string())
}
