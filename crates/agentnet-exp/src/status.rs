use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an experiment, also used for its trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Configuration or runtime failure; only a reset or new inputs recover.
    Invalid,
    /// Idle and able to run.
    Ready,
    /// Waiting in the dispatcher queue.
    Queued,
    /// Trials are being stepped.
    Running,
    /// Every trial reached its stop condition.
    Finished,
}

impl Status {
    /// Returns true when `self -> to` is a legal experiment transition.
    ///
    /// Any status may become [`Status::Invalid`]; leaving `Invalid` or
    /// `Finished` goes through a reset instead.
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (_, Invalid)
                | (Ready, Queued)
                | (Queued, Ready)
                | (Ready, Running)
                | (Queued, Running)
                | (Running, Ready)
                | (Running, Finished)
        )
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Status::Invalid => 0,
            Status::Ready => 1,
            Status::Queued => 2,
            Status::Running => 3,
            Status::Finished => 4,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Status {
        match raw {
            1 => Status::Ready,
            2 => Status::Queued,
            3 => Status::Running,
            4 => Status::Finished,
            _ => Status::Invalid,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Invalid => "invalid",
            Status::Ready => "ready",
            Status::Queued => "queued",
            Status::Running => "running",
            Status::Finished => "finished",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip() {
        for status in [
            Status::Invalid,
            Status::Ready,
            Status::Queued,
            Status::Running,
            Status::Finished,
        ] {
            assert_eq!(Status::from_u8(status.as_u8()), status);
        }
    }
}
