/// All timestamps are stored and transported as UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar dates (validity interval bounds) carry no time of day.
pub type Date = chrono::NaiveDate;
