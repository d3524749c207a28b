use chrono::{DateTime, Timelike, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Asia,
    London,
    Overlap,
    NewYork,
    LateNewYork,
}

impl Session {
    pub fn as_str(&self) -> &'static str {
        match self {
            Session::Asia => "ASIA",
            Session::London => "LONDON",
            Session::Overlap => "OVERLAP",
            Session::NewYork => "NEW_YORK",
            Session::LateNewYork => "LATE_NEW_YORK",
        }
    }
}

/// Trading session bucket from the UTC hour-of-day.
pub fn session_for(now: DateTime<Utc>) -> Session {
    match now.hour() {
        0..=6 => Session::Asia,
        7..=11 => Session::London,
        12..=15 => Session::Overlap,
        16..=20 => Session::NewYork,
        _ => Session::LateNewYork,
    }
}
