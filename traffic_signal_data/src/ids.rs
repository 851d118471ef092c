use std::convert::TryFrom;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifies one intersection in a batch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct IntersectionID(pub String);

impl fmt::Display for IntersectionID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Intersection #{}", self.0)
    }
}

impl From<&str> for IntersectionID {
    fn from(x: &str) -> IntersectionID {
        IntersectionID(x.to_string())
    }
}

/// A physical road segment (or lane group) controlled by a signal. Upstream data sometimes writes
/// these as JSON numbers and sometimes as strings, so both are accepted. They're always written
/// back out as strings, and ordered by their string form.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkID(pub String);

impl fmt::Display for LinkID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LinkID {
    fn from(x: &str) -> LinkID {
        LinkID(x.to_string())
    }
}

impl Serialize for LinkID {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LinkID {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<LinkID, D::Error> {
        d.deserialize_any(LinkIDVisitor)
    }
}

struct LinkIDVisitor;

impl<'de> Visitor<'de> for LinkIDVisitor {
    type Value = LinkID;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a link ID as a string or integer")
    }

    fn visit_str<E: de::Error>(self, x: &str) -> Result<LinkID, E> {
        Ok(LinkID(x.to_string()))
    }

    fn visit_string<E: de::Error>(self, x: String) -> Result<LinkID, E> {
        Ok(LinkID(x))
    }

    fn visit_u64<E: de::Error>(self, x: u64) -> Result<LinkID, E> {
        Ok(LinkID(x.to_string()))
    }

    fn visit_i64<E: de::Error>(self, x: i64) -> Result<LinkID, E> {
        Ok(LinkID(x.to_string()))
    }
}

/// One of the roads feeding into an intersection, called a "way" in the source data. The
/// two-road model only uses 0 and 1.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Approach(pub usize);

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "way {}", self.0)
    }
}

/// How a vehicle moves through the intersection. Serialized as the integer code used by the
/// upstream data.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
    Straight,
    Left,
    Right,
    UTurn,
}

impl Direction {
    pub fn code(self) -> u8 {
        match self {
            Direction::Straight => 0,
            Direction::Left => 1,
            Direction::Right => 2,
            Direction::UTurn => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Direction> {
        match code {
            0 => Some(Direction::Straight),
            1 => Some(Direction::Left),
            2 => Some(Direction::Right),
            7 => Some(Direction::UTurn),
            _ => None,
        }
    }

    /// Left, right, and U-turns.
    pub fn is_turn(self) -> bool {
        self != Direction::Straight
    }
}

impl TryFrom<u8> for Direction {
    type Error = String;

    fn try_from(code: u8) -> Result<Direction, String> {
        Direction::from_code(code).ok_or_else(|| format!("unknown direction code {}", code))
    }
}

impl From<Direction> for u8 {
    fn from(dir: Direction) -> u8 {
        dir.code()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Straight => write!(f, "straight"),
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
            Direction::UTurn => write!(f, "U-turn"),
        }
    }
}
