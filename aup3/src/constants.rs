use crate::Aup3Error;

/// `PRAGMA application_id` of every Audacity project database ("AUDY").
pub const AUDACITY_APPLICATION_ID: i64 = 0x4155_4459;

#[repr(u32)]
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum SampleFormat {
    Int16 = 0x0002_0001,
    Int24 = 0x0004_0001,
    Float = 0x0004_000F,
}

impl SampleFormat {
    /// Bytes per sample in a packed blob.
    pub fn byte_width(self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Int24 => 3,
            Self::Float => 4,
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }
}

impl TryFrom<i64> for SampleFormat {
    type Error = Aup3Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0x0002_0001 => Ok(Self::Int16),
            0x0004_0001 => Ok(Self::Int24),
            0x0004_000F => Ok(Self::Float),
            _ => Err(Aup3Error::UnsupportedFormat(value)),
        }
    }
}

/// Field codes of Audacity's binary XML serialization.
#[repr(u8)]
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum FieldType {
    CharSize = 0,
    StartTag = 1,
    EndTag = 2,
    String = 3,
    Int = 4,
    Bool = 5,
    Long = 6,
    LongLong = 7,
    SizeT = 8,
    Float = 9,
    Double = 10,
    Data = 11,
    Raw = 12,
    Push = 13,
    Pop = 14,
    Name = 15,
}

impl TryFrom<u8> for FieldType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::CharSize,
            1 => Self::StartTag,
            2 => Self::EndTag,
            3 => Self::String,
            4 => Self::Int,
            5 => Self::Bool,
            6 => Self::Long,
            7 => Self::LongLong,
            8 => Self::SizeT,
            9 => Self::Float,
            10 => Self::Double,
            11 => Self::Data,
            12 => Self::Raw,
            13 => Self::Push,
            14 => Self::Pop,
            15 => Self::Name,
            x => return Err(x),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_format_tags() {
        assert_eq!(SampleFormat::try_from(0x0002_0001).unwrap(), SampleFormat::Int16);
        assert_eq!(SampleFormat::try_from(0x0004_0001).unwrap(), SampleFormat::Int24);
        assert_eq!(SampleFormat::try_from(0x0004_000F).unwrap(), SampleFormat::Float);
        assert_eq!(SampleFormat::Float.tag(), 0x0004_000F);
    }

    #[test]
    fn test_unknown_sample_format() {
        assert!(matches!(SampleFormat::try_from(7), Err(Aup3Error::UnsupportedFormat(7))));
    }

    #[test]
    fn test_field_type_codes() {
        assert_eq!(FieldType::try_from(10), Ok(FieldType::Double));
        assert_eq!(FieldType::try_from(16), Err(16));
    }
}
