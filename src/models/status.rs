use std::fmt::{Display, Formatter, Result};

/// How a push delivery was classified. Every variant is acknowledged with 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Ok,
    NoData,
    BadMessage,
}

impl PushOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushOutcome::Ok => "ok",
            PushOutcome::NoData => "no data",
            PushOutcome::BadMessage => "bad message",
        }
    }
}

impl Display for PushOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.as_str())
    }
}
