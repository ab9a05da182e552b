use std::fmt;

use crate::device::sample::Sample;

/**
 * A band is the open interval (BAND_LOWER, BAND_UPPER) on one axis, mirrored
 * for negative values. Values on the bounds themselves do not match. With
 * the device at rest, gravity puts exactly one axis inside a band; values
 * outside every band (free fall, shaking, diagonal holds) leave the state
 * unchanged.
 */
pub const BAND_LOWER: i16 = 850;
pub const BAND_UPPER: i16 = 1200;

/**
 * The six faces of the device. The discriminant doubles as the numeric
 * status code written to the status log.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Neutral = 0,
    Inverted = 1,
    TiltRight = 2,
    TiltLeft = 3,
    TiltForward = 4,
    TiltBack = 5,
}

/**
 * Message and icon tag a presence broadcast carries for one orientation.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence {
    pub message: &'static str,
    pub icon: &'static str,
}

// Indexed by status code.
const PRESENCE_TABLE: [Presence; 6] = [
    Presence { message: "Available", icon: ":large_green_circle:" },
    Presence { message: "Do not disturb", icon: ":no_entry:" },
    Presence { message: "In a meeting", icon: ":calendar:" },
    Presence { message: "Focus time", icon: ":headphones:" },
    Presence { message: "Out for lunch", icon: ":fork_and_knife:" },
    Presence { message: "Away from desk", icon: ":walking:" },
];

impl Orientation {
    pub const ALL: [Orientation; 6] = [
        Orientation::Neutral,
        Orientation::Inverted,
        Orientation::TiltRight,
        Orientation::TiltLeft,
        Orientation::TiltForward,
        Orientation::TiltBack,
    ];

    /**
     * Numeric code used in status-log records.
     */
    pub fn status_code(self) -> u8 {
        self as u8
    }

    pub fn presence(self) -> &'static Presence {
        &PRESENCE_TABLE[self as usize]
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            Orientation::Neutral => "neutral",
            Orientation::Inverted => "inverted",
            Orientation::TiltRight => "tilt right",
            Orientation::TiltLeft => "tilt left",
            Orientation::TiltForward => "tilt forward",
            Orientation::TiltBack => "tilt back",
        };

        write!(f, "{}", result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub orientation: Option<Orientation>,
    pub changed: bool,
}

fn band_state(value: i16, positive: Orientation, negative: Orientation) -> Option<Orientation> {
    if value > BAND_LOWER && value < BAND_UPPER {
        Some(positive)
    } else if value < -BAND_LOWER && value > -BAND_UPPER {
        Some(negative)
    } else {
        None
    }
}

/**
 * Resolves a sample against the previous orientation. A sample that matches
 * no band keeps the previous state (`changed = false`). Should a malformed
 * sample put several axes inside a band at once, axes are resolved in
 * z, x, y order; that priority is a documented contract, not an error.
 */
pub fn classify(previous: Option<Orientation>, sample: &Sample) -> Classified {
    let resolved = band_state(sample.z, Orientation::Neutral, Orientation::Inverted)
        .or_else(|| band_state(sample.x, Orientation::TiltRight, Orientation::TiltLeft))
        .or_else(|| band_state(sample.y, Orientation::TiltForward, Orientation::TiltBack))
        .or(previous);

    Classified { orientation: resolved, changed: resolved != previous }
}
