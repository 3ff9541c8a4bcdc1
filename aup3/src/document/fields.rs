use nom::{
    bytes::complete::take,
    combinator::{flat_map, map},
    number::complete::{le_f32, le_f64, le_u16, le_u32, u8},
    sequence::tuple,
    IResult,
};
use nom_derive::{NomLE, Parse};

use crate::{Aup3Error, FieldType, Result};

/// Attribute payload before name resolution and text decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Text(&'a [u8]),
    Int(i64),
    Bool(bool),
    Float(f64),
}

/// One record of the binary XML stream. Ids refer to the name table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    CharSize(u8),
    StartTag(u16),
    EndTag(u16),
    Attribute { id: u16, value: RawValue<'a> },
    Data(&'a [u8]),
    Raw(&'a [u8]),
    Push,
    Pop,
    Name { id: u16, text: &'a [u8] },
}

impl<'a> Field<'a> {
    fn attribute(id: u16, value: RawValue<'a>) -> Self {
        Self::Attribute { id, value }
    }
}

#[derive(NomLE)]
#[nom(Complete)]
struct NamePayload<'a> {
    id: u16,
    #[nom(Parse = "flat_map(le_u16, take)")]
    text: &'a [u8],
}

#[derive(NomLE)]
#[nom(Complete)]
struct TextPayload<'a> {
    id: u16,
    #[nom(Parse = "flat_map(le_u32, take)")]
    value: &'a [u8],
}

#[derive(NomLE)]
#[nom(Complete)]
struct IntPayload {
    id: u16,
    value: i32,
}

#[derive(NomLE)]
#[nom(Complete)]
struct LongLongPayload {
    id: u16,
    value: i64,
}

// floats carry a trailing digit count used only for display
#[derive(NomLE)]
#[nom(Complete)]
struct FloatPayload {
    id: u16,
    #[nom(Parse = "le_f32")]
    value: f32,
    _digits: i32,
}

#[derive(NomLE)]
#[nom(Complete)]
struct DoublePayload {
    id: u16,
    #[nom(Parse = "le_f64")]
    value: f64,
    _digits: i32,
}

impl<'a> Parse<&'a [u8]> for Field<'a> {
    fn parse(input: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (data, code) = u8(input)?;
        let field_type = FieldType::try_from(code)
            .map_err(|_| nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Switch)))?;

        match field_type {
            FieldType::CharSize => map(u8, Self::CharSize)(data),
            FieldType::StartTag => map(le_u16, Self::StartTag)(data),
            FieldType::EndTag => map(le_u16, Self::EndTag)(data),
            FieldType::String => map(TextPayload::parse, |x| Self::attribute(x.id, RawValue::Text(x.value)))(data),
            FieldType::Int | FieldType::Long => map(IntPayload::parse, |x| Self::attribute(x.id, RawValue::Int(x.value.into())))(data),
            FieldType::Bool => map(tuple((le_u16, u8)), |(id, x)| Self::attribute(id, RawValue::Bool(x != 0)))(data),
            FieldType::LongLong => map(LongLongPayload::parse, |x| Self::attribute(x.id, RawValue::Int(x.value)))(data),
            FieldType::SizeT => map(tuple((le_u16, le_u32)), |(id, x)| Self::attribute(id, RawValue::Int(x.into())))(data),
            FieldType::Float => map(FloatPayload::parse, |x| Self::attribute(x.id, RawValue::Float(x.value.into())))(data),
            FieldType::Double => map(DoublePayload::parse, |x| Self::attribute(x.id, RawValue::Float(x.value)))(data),
            FieldType::Data => map(flat_map(le_u32, take), Self::Data)(data),
            FieldType::Raw => map(flat_map(le_u32, take), Self::Raw)(data),
            FieldType::Push => Ok((data, Self::Push)),
            FieldType::Pop => Ok((data, Self::Pop)),
            FieldType::Name => map(NamePayload::parse, |x| Self::Name { id: x.id, text: x.text })(data),
        }
    }
}

/// Iterator over the fields of a serialized document.
///
/// Yields an error and stops at the first field that cannot be decoded.
pub struct Fields<'a> {
    raw: &'a [u8],
    rest: &'a [u8],
    failed: bool,
}

impl<'a> Fields<'a> {
    pub fn new(raw: &'a [u8]) -> Self {
        Self { raw, rest: raw, failed: false }
    }

    fn offset(&self, rest: &[u8]) -> usize {
        self.raw.len() - rest.len()
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<Field<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.rest.is_empty() {
            return None;
        }

        match Field::parse(self.rest) {
            Ok((rest, field)) => {
                self.rest = rest;
                Some(Ok(field))
            }
            Err(e) => {
                self.failed = true;
                let offset = self.offset(self.rest);
                let message = match e {
                    nom::Err::Failure(x) if x.code == nom::error::ErrorKind::Switch => {
                        format!("unknown field type {} at byte {}", self.rest[0], offset)
                    }
                    _ => format!("truncated field at byte {}", offset),
                };
                Some(Err(Aup3Error::MalformedProject(message)))
            }
        }
    }
}
