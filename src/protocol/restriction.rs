//! Restriction trees and property names used by get-matches

use std::fmt;

use super::arrays::{put_list, read_list};
use super::codec::{WireDecode, WireEncode, WireReader, WireWriter};
use super::{Error, FlatUid, PropertyTag, PropertyValue, Result};

/// Deepest nesting accepted for And/Or/Not/Sub chains
pub const MAX_RESTRICTION_DEPTH: usize = 64;

/// Relational operator for property, size and compare restrictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RelOp {
    /// Less than
    Lt = 0,
    /// Less than or equal
    Le = 1,
    /// Greater than
    Gt = 2,
    /// Greater than or equal
    Ge = 3,
    /// Equal
    Eq = 4,
    /// Not equal
    Ne = 5,
    /// Regular expression match
    Re = 6,
}

impl RelOp {
    /// Convert from the wire byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Lt),
            1 => Some(Self::Le),
            2 => Some(Self::Gt),
            3 => Some(Self::Ge),
            4 => Some(Self::Eq),
            5 => Some(Self::Ne),
            6 => Some(Self::Re),
            _ => None,
        }
    }

    /// Convert to the wire byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lt => "RELOP_LT",
            Self::Le => "RELOP_LE",
            Self::Gt => "RELOP_GT",
            Self::Ge => "RELOP_GE",
            Self::Eq => "RELOP_EQ",
            Self::Ne => "RELOP_NE",
            Self::Re => "RELOP_RE",
        };
        write!(f, "{name}")
    }
}

/// Bitmask test applied by [`Restriction::Bitmask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BitmaskOp {
    /// Masked bits are all zero
    EqualZero = 0,
    /// Some masked bit is set
    NotEqualZero = 1,
}

impl BitmaskOp {
    /// Convert from the wire byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::EqualZero),
            1 => Some(Self::NotEqualZero),
            _ => None,
        }
    }

    /// Convert to the wire byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// How much of a string a content restriction must match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FuzzyMode {
    /// Whole string
    FullString = 0,
    /// Any substring
    Substring = 1,
    /// Leading characters
    Prefix = 2,
}

impl FuzzyMode {
    /// Convert from the wire value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::FullString),
            1 => Some(Self::Substring),
            2 => Some(Self::Prefix),
            _ => None,
        }
    }
}

/// Fuzzy level of a content restriction: match mode plus option bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuzzyLevel {
    /// Match mode (low word)
    pub mode: FuzzyMode,
    /// Option bits (high word)
    pub options: u16,
}

impl FuzzyLevel {
    /// Ignore case
    pub const IGNORE_CASE: u16 = 0x0001;
    /// Ignore non-spacing characters
    pub const IGNORE_NON_SPACE: u16 = 0x0002;
    /// Loose matching
    pub const LOOSE: u16 = 0x0004;

    /// Level with no option bits
    #[must_use]
    pub const fn new(mode: FuzzyMode) -> Self {
        Self { mode, options: 0 }
    }

    /// Add option bits
    #[must_use]
    pub const fn with_options(mut self, options: u16) -> Self {
        self.options |= options;
        self
    }
}

/// Restriction types on the wire
mod kind {
    pub const AND: u8 = 0x00;
    pub const OR: u8 = 0x01;
    pub const NOT: u8 = 0x02;
    pub const CONTENT: u8 = 0x03;
    pub const PROPERTY: u8 = 0x04;
    pub const COMPARE_PROPS: u8 = 0x05;
    pub const BITMASK: u8 = 0x06;
    pub const SIZE: u8 = 0x07;
    pub const EXIST: u8 = 0x08;
    pub const SUB: u8 = 0x09;
}

/// Filter applied by get-matches (`Restriction_r`).
///
/// Encoded as a one-byte restriction type followed by a type-specific body.
/// Values carried by content and property restrictions use the tagged form
/// of [`PropertyValue`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Restriction {
    /// All children must match
    And(Vec<Restriction>),
    /// Any child must match
    Or(Vec<Restriction>),
    /// Child must not match
    Not(Box<Restriction>),
    /// String or binary content match
    Content {
        /// Match mode and options
        fuzzy: FuzzyLevel,
        /// Property to test
        tag: PropertyTag,
        /// Value to look for
        value: PropertyValue,
    },
    /// Compare a property with a value
    Property {
        /// Operator
        relop: RelOp,
        /// Property to test
        tag: PropertyTag,
        /// Value to compare with
        value: PropertyValue,
    },
    /// Compare two properties of the same object
    CompareProps {
        /// Operator
        relop: RelOp,
        /// Left-hand property
        left: PropertyTag,
        /// Right-hand property
        right: PropertyTag,
    },
    /// Test bits of an integer property
    Bitmask {
        /// Test applied
        op: BitmaskOp,
        /// Property to test
        tag: PropertyTag,
        /// Bits to test
        mask: u32,
    },
    /// Compare the size of a property value
    Size {
        /// Operator
        relop: RelOp,
        /// Property to test
        tag: PropertyTag,
        /// Size in bytes
        size: u32,
    },
    /// Property is present
    Exist {
        /// Property to test
        tag: PropertyTag,
    },
    /// Apply a restriction to a sub-object
    Sub {
        /// Sub-object property
        subobject: PropertyTag,
        /// Restriction on the sub-object
        restriction: Box<Restriction>,
    },
}

impl Restriction {
    /// `tag == value`
    #[must_use]
    pub fn equals(value: PropertyValue) -> Self {
        Self::Property {
            relop: RelOp::Eq,
            tag: value.tag(),
            value,
        }
    }

    /// `value` appears as a prefix of the property, ignoring case
    #[must_use]
    pub fn prefix(value: PropertyValue) -> Self {
        Self::Content {
            fuzzy: FuzzyLevel::new(FuzzyMode::Prefix).with_options(FuzzyLevel::IGNORE_CASE),
            tag: value.tag(),
            value,
        }
    }

    /// Property exists
    #[must_use]
    pub const fn exists(tag: PropertyTag) -> Self {
        Self::Exist { tag }
    }

    /// Nesting depth; a leaf has depth 1
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::And(children) | Self::Or(children) => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
            Self::Not(child) => 1 + child.depth(),
            Self::Sub { restriction, .. } => 1 + restriction.depth(),
            _ => 1,
        }
    }

    fn encode_at(&self, writer: &mut WireWriter, depth: usize) -> Result<()> {
        check_depth(depth)?;
        match self {
            Self::And(children) | Self::Or(children) => {
                writer.put_u8(if matches!(self, Self::And(_)) {
                    kind::AND
                } else {
                    kind::OR
                });
                put_list(writer, children, "restriction.count", |w, child| {
                    child.encode_at(w, depth + 1)
                })?;
            }
            Self::Not(child) => {
                writer.put_u8(kind::NOT);
                child.encode_at(writer, depth + 1)?;
            }
            Self::Content { fuzzy, tag, value } => {
                writer.put_u8(kind::CONTENT);
                writer.put_u16(fuzzy.mode as u16);
                writer.put_u16(fuzzy.options);
                writer.put_u32(tag.as_u32());
                value.encode_into(writer)?;
            }
            Self::Property { relop, tag, value } => {
                writer.put_u8(kind::PROPERTY);
                writer.put_u8(relop.as_u8());
                writer.put_u32(tag.as_u32());
                value.encode_into(writer)?;
            }
            Self::CompareProps { relop, left, right } => {
                writer.put_u8(kind::COMPARE_PROPS);
                writer.put_u8(relop.as_u8());
                writer.put_u32(left.as_u32());
                writer.put_u32(right.as_u32());
            }
            Self::Bitmask { op, tag, mask } => {
                writer.put_u8(kind::BITMASK);
                writer.put_u8(op.as_u8());
                writer.put_u32(tag.as_u32());
                writer.put_u32(*mask);
            }
            Self::Size { relop, tag, size } => {
                writer.put_u8(kind::SIZE);
                writer.put_u8(relop.as_u8());
                writer.put_u32(tag.as_u32());
                writer.put_u32(*size);
            }
            Self::Exist { tag } => {
                writer.put_u8(kind::EXIST);
                writer.put_u32(tag.as_u32());
            }
            Self::Sub {
                subobject,
                restriction,
            } => {
                writer.put_u8(kind::SUB);
                writer.put_u32(subobject.as_u32());
                restriction.encode_at(writer, depth + 1)?;
            }
        }
        Ok(())
    }

    fn decode_at(reader: &mut WireReader<'_>, depth: usize) -> Result<Self> {
        check_depth(depth)?;
        let restriction_type = reader.read_u8("restriction.type")?;
        let restriction = match restriction_type {
            kind::AND | kind::OR => {
                let children = read_list(reader, "restriction.count", 1, |r| {
                    Self::decode_at(r, depth + 1)
                })?;
                if restriction_type == kind::AND {
                    Self::And(children)
                } else {
                    Self::Or(children)
                }
            }
            kind::NOT => Self::Not(Box::new(Self::decode_at(reader, depth + 1)?)),
            kind::CONTENT => {
                let raw_mode = reader.read_u16("restriction.fuzzy_level")?;
                let mode = FuzzyMode::from_u16(raw_mode).ok_or(Error::InvalidRestriction {
                    field: "fuzzy_level",
                    found: u32::from(raw_mode),
                })?;
                let options = reader.read_u16("restriction.fuzzy_options")?;
                let tag = PropertyTag::from_u32(reader.read_u32("restriction.tag")?);
                let value = PropertyValue::decode_from(reader)?;
                Self::Content {
                    fuzzy: FuzzyLevel { mode, options },
                    tag,
                    value,
                }
            }
            kind::PROPERTY => {
                let relop = read_relop(reader)?;
                let tag = PropertyTag::from_u32(reader.read_u32("restriction.tag")?);
                let value = PropertyValue::decode_from(reader)?;
                Self::Property { relop, tag, value }
            }
            kind::COMPARE_PROPS => Self::CompareProps {
                relop: read_relop(reader)?,
                left: PropertyTag::from_u32(reader.read_u32("restriction.left")?),
                right: PropertyTag::from_u32(reader.read_u32("restriction.right")?),
            },
            kind::BITMASK => {
                let raw = reader.read_u8("restriction.bitmask_op")?;
                let op = BitmaskOp::from_u8(raw).ok_or(Error::InvalidRestriction {
                    field: "bitmask_op",
                    found: u32::from(raw),
                })?;
                Self::Bitmask {
                    op,
                    tag: PropertyTag::from_u32(reader.read_u32("restriction.tag")?),
                    mask: reader.read_u32("restriction.mask")?,
                }
            }
            kind::SIZE => Self::Size {
                relop: read_relop(reader)?,
                tag: PropertyTag::from_u32(reader.read_u32("restriction.tag")?),
                size: reader.read_u32("restriction.size")?,
            },
            kind::EXIST => Self::Exist {
                tag: PropertyTag::from_u32(reader.read_u32("restriction.tag")?),
            },
            kind::SUB => Self::Sub {
                subobject: PropertyTag::from_u32(reader.read_u32("restriction.subobject")?),
                restriction: Box::new(Self::decode_at(reader, depth + 1)?),
            },
            found => {
                return Err(Error::InvalidRestriction {
                    field: "type",
                    found: u32::from(found),
                });
            }
        };
        Ok(restriction)
    }
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_RESTRICTION_DEPTH {
        return Err(Error::BoundsExceeded {
            field: "restriction.depth",
            count: depth,
            max: MAX_RESTRICTION_DEPTH,
        });
    }
    Ok(())
}

fn read_relop(reader: &mut WireReader<'_>) -> Result<RelOp> {
    let raw = reader.read_u8("restriction.relop")?;
    RelOp::from_u8(raw).ok_or(Error::InvalidRestriction {
        field: "relop",
        found: u32::from(raw),
    })
}

impl WireEncode for Restriction {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        self.encode_at(writer, 1)
    }
}

impl WireDecode for Restriction {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        Self::decode_at(reader, 1)
    }
}

/// Named property (`PropertyName_r`): property set GUID plus numeric name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyName {
    /// Property set
    pub guid: FlatUid,
    /// Numeric name within the set
    pub id: u32,
}

impl PropertyName {
    /// Create a property name
    #[must_use]
    pub const fn new(guid: FlatUid, id: u32) -> Self {
        Self { guid, id }
    }
}

impl WireEncode for PropertyName {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        self.guid.encode_into(writer)?;
        writer.put_u32(0);
        writer.put_u32(self.id);
        Ok(())
    }
}

impl WireDecode for PropertyName {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let guid = FlatUid::decode_from(reader)?;
        let reserved = reader.read_u32("property_name.reserved")?;
        if reserved != 0 {
            return Err(Error::ReservedField {
                field: "property_name.reserved",
                expected: 0,
                found: reserved,
            });
        }
        let id = reader.read_u32("property_name.id")?;
        Ok(Self { guid, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PID_TAG_DISPLAY_NAME, PID_TAG_OBJECT_TYPE, TypedValue, decode, encode};

    fn display_name(text: &str) -> PropertyValue {
        PropertyValue::new(PID_TAG_DISPLAY_NAME, TypedValue::String8(text.as_bytes().to_vec()))
            .unwrap()
    }

    #[test]
    fn test_nested_restriction_roundtrip() {
        let restriction = Restriction::And(vec![
            Restriction::prefix(display_name("Adm")),
            Restriction::Not(Box::new(Restriction::exists(PID_TAG_OBJECT_TYPE))),
            Restriction::Or(vec![
                Restriction::Bitmask {
                    op: BitmaskOp::NotEqualZero,
                    tag: PID_TAG_OBJECT_TYPE,
                    mask: 0x6,
                },
                Restriction::Size {
                    relop: RelOp::Gt,
                    tag: PID_TAG_DISPLAY_NAME,
                    size: 3,
                },
            ]),
        ]);

        assert_eq!(restriction.depth(), 3);
        let bytes = encode(&restriction).unwrap();
        assert_eq!(bytes[0], 0x00);
        assert_eq!(decode::<Restriction>(&bytes).unwrap(), restriction);
    }

    #[test]
    fn test_invalid_restriction_type() {
        assert_eq!(
            decode::<Restriction>(&[0x0C]).unwrap_err(),
            Error::InvalidRestriction {
                field: "type",
                found: 0x0C
            }
        );
    }

    #[test]
    fn test_invalid_relop() {
        let bytes = [0x05, 0x09, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            decode::<Restriction>(&bytes).unwrap_err(),
            Error::InvalidRestriction {
                field: "relop",
                found: 9
            }
        );
    }

    #[test]
    fn test_depth_bounded() {
        let mut restriction = Restriction::exists(PID_TAG_OBJECT_TYPE);
        for _ in 0..MAX_RESTRICTION_DEPTH {
            restriction = Restriction::Not(Box::new(restriction));
        }
        assert!(matches!(
            encode(&restriction),
            Err(Error::BoundsExceeded {
                field: "restriction.depth",
                ..
            })
        ));

        let bytes = vec![kind::NOT; MAX_RESTRICTION_DEPTH + 1];
        assert!(matches!(
            decode::<Restriction>(&bytes),
            Err(Error::BoundsExceeded { .. })
        ));
    }

    #[test]
    fn test_property_name_reserved() {
        let name = PropertyName::new(FlatUid::from_bytes([1; 16]), 0x8001);
        let mut bytes = encode(&name).unwrap().to_vec();
        assert_eq!(bytes.len(), 24);
        assert_eq!(decode::<PropertyName>(&bytes).unwrap(), name);

        bytes[16] = 1;
        assert!(matches!(
            decode::<PropertyName>(&bytes),
            Err(Error::ReservedField { .. })
        ));
    }
}
