use core::{fmt, mem};
use std::collections::HashMap;

use super::fields::{Field, Fields, RawValue};
use crate::{Aup3Error, Result};

/// Decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    Float(f64),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            Self::Int(x) => Some(*x as f64),
            Self::Text(x) => x.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(x) => Some(*x),
            Self::Text(x) => x.trim().parse().ok(),
            Self::Float(_) | Self::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(x) => Some(x),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(x) => f.write_str(x),
            Self::Int(x) => write!(f, "{}", x),
            Self::Bool(x) => write!(f, "{}", *x as u8),
            Self::Float(x) => write!(f, "{}", x),
        }
    }
}

/// A start tag together with all of its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, Value)>,
}

impl Element {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.iter().find(|(x, _)| x == name).map(|(_, x)| x)
    }
}

/// Receives the document in order, depth first.
pub trait DocumentVisitor {
    fn start_element(&mut self, element: &Element) -> Result<()>;

    fn end_element(&mut self, name: &str) -> Result<()>;

    fn text(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn raw(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Replays a serialized document into `visitor` in a single pass.
pub fn walk<V: DocumentVisitor>(raw: &[u8], visitor: &mut V) -> Result<()> {
    let mut walker = Walker::default();
    for field in Fields::new(raw) {
        walker.field(field?, visitor)?;
    }
    walker.finish(visitor)
}

#[derive(Default)]
struct Walker {
    char_size: Option<u8>,
    names: HashMap<u16, String>,
    saved_names: Vec<HashMap<u16, String>>,
    open: Vec<String>,
    // attributes keep arriving until the next tag field
    pending: Option<Element>,
}

impl Walker {
    fn field<V: DocumentVisitor>(&mut self, field: Field<'_>, visitor: &mut V) -> Result<()> {
        match field {
            Field::CharSize(x) => match x {
                1 | 2 | 4 => self.char_size = Some(x),
                _ => return Err(malformed(format!("unsupported character size {}", x))),
            },
            Field::Name { id, text } => {
                let name = self.decode_text(text)?;
                self.names.insert(id, name);
            }
            Field::Push => self.saved_names.push(mem::take(&mut self.names)),
            Field::Pop => self.names = self.saved_names.pop().ok_or_else(|| malformed("name table pop without push"))?,
            Field::StartTag(id) => {
                self.flush(visitor)?;
                let name = self.name(id)?.to_owned();
                self.open.push(name.clone());
                self.pending = Some(Element { name, attributes: Vec::new() });
            }
            Field::EndTag(id) => {
                self.flush(visitor)?;
                let name = self.name(id)?.to_owned();
                match self.open.pop() {
                    Some(x) if x == name => visitor.end_element(&x)?,
                    Some(x) => return Err(malformed(format!("</{}> closes <{}>", name, x))),
                    None => return Err(malformed(format!("</{}> without matching start tag", name))),
                }
            }
            Field::Attribute { id, value } => {
                let name = self.name(id)?.to_owned();
                let value = match value {
                    RawValue::Text(x) => Value::Text(self.decode_text(x)?),
                    RawValue::Int(x) => Value::Int(x),
                    RawValue::Bool(x) => Value::Bool(x),
                    RawValue::Float(x) => Value::Float(x),
                };
                let element = self
                    .pending
                    .as_mut()
                    .ok_or_else(|| malformed(format!("attribute \"{}\" outside of a start tag", name)))?;
                element.attributes.push((name, value));
            }
            Field::Data(x) => {
                self.flush(visitor)?;
                visitor.text(&self.decode_text(x)?)?;
            }
            Field::Raw(x) => {
                self.flush(visitor)?;
                visitor.raw(&self.decode_text(x)?)?;
            }
        }
        Ok(())
    }

    fn finish<V: DocumentVisitor>(mut self, visitor: &mut V) -> Result<()> {
        self.flush(visitor)?;
        match self.open.last() {
            Some(x) => Err(malformed(format!("unterminated element <{}>", x))),
            None => Ok(()),
        }
    }

    fn flush<V: DocumentVisitor>(&mut self, visitor: &mut V) -> Result<()> {
        match self.pending.take() {
            Some(element) => visitor.start_element(&element),
            None => Ok(()),
        }
    }

    fn name(&self, id: u16) -> Result<&str> {
        self.names
            .get(&id)
            .map(String::as_str)
            .ok_or_else(|| malformed(format!("unknown name id {}", id)))
    }

    fn decode_text(&self, raw: &[u8]) -> Result<String> {
        let char_size = self.char_size.ok_or_else(|| malformed("text before character size"))?;
        decode_text(raw, char_size)
    }
}

fn decode_text(raw: &[u8], char_size: u8) -> Result<String> {
    if raw.len() % char_size as usize != 0 {
        return Err(malformed(format!("text of {} bytes is not a multiple of {}", raw.len(), char_size)));
    }

    match char_size {
        1 => String::from_utf8(raw.to_vec()).map_err(|_| malformed("invalid UTF-8 text")),
        2 => {
            let units = raw.chunks_exact(2).map(|x| u16::from_le_bytes([x[0], x[1]])).collect::<Vec<_>>();
            String::from_utf16(&units).map_err(|_| malformed("invalid UTF-16 text"))
        }
        _ => raw
            .chunks_exact(4)
            .map(|x| char::from_u32(u32::from_le_bytes([x[0], x[1], x[2], x[3]])))
            .collect::<Option<String>>()
            .ok_or_else(|| malformed("invalid UTF-32 text")),
    }
}

fn malformed(message: impl Into<String>) -> Aup3Error {
    Aup3Error::MalformedProject(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl DocumentVisitor for Recorder {
        fn start_element(&mut self, element: &Element) -> Result<()> {
            let attributes = element.attributes.iter().map(|(k, v)| format!(" {}={}", k, v)).collect::<String>();
            self.events.push(format!("<{}{}>", element.name, attributes));
            Ok(())
        }

        fn end_element(&mut self, name: &str) -> Result<()> {
            self.events.push(format!("</{}>", name));
            Ok(())
        }
    }

    fn name(id: u16, text: &str) -> Vec<u8> {
        let mut out = vec![15];
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&(text.len() as u16).to_le_bytes());
        out.extend_from_slice(text.as_bytes());
        out
    }

    fn record(raw: &[u8]) -> Result<Vec<String>> {
        let mut recorder = Recorder::default();
        walk(raw, &mut recorder)?;
        Ok(recorder.events)
    }

    #[test]
    fn test_attributes_attach_to_open_element() {
        let mut raw = vec![0, 1];
        raw.extend(name(0, "a"));
        raw.extend(name(1, "b"));
        raw.extend(name(2, "x"));
        raw.extend_from_slice(&[1, 0, 0, 4, 2, 0, 7, 0, 0, 0, 1, 1, 0, 5, 2, 0, 1, 2, 1, 0, 2, 0, 0]);

        let events = record(&raw).unwrap();

        assert_eq!(events, vec!["<a x=7>", "<b x=1>", "</b>", "</a>"]);
    }

    #[test]
    fn test_mismatched_end_tag() {
        let mut raw = vec![0, 1];
        raw.extend(name(0, "a"));
        raw.extend(name(1, "b"));
        raw.extend_from_slice(&[1, 0, 0, 2, 1, 0]);

        assert!(matches!(record(&raw), Err(Aup3Error::MalformedProject(x)) if x == "</b> closes <a>"));
    }

    #[test]
    fn test_unterminated_element() {
        let mut raw = vec![0, 1];
        raw.extend(name(0, "a"));
        raw.extend_from_slice(&[1, 0, 0]);

        assert!(matches!(record(&raw), Err(Aup3Error::MalformedProject(x)) if x == "unterminated element <a>"));
    }

    #[test]
    fn test_unknown_name_id() {
        let raw = [0, 1, 1, 9, 0];

        assert!(matches!(record(&raw), Err(Aup3Error::MalformedProject(x)) if x == "unknown name id 9"));
    }

    #[test]
    fn test_push_pop_restores_names() {
        let mut raw = vec![0, 1];
        raw.extend(name(0, "outer"));
        raw.push(13);
        raw.extend(name(0, "inner"));
        raw.extend_from_slice(&[1, 0, 0, 2, 0, 0, 14, 1, 0, 0, 2, 0, 0]);

        let events = record(&raw).unwrap();

        assert_eq!(events, vec!["<inner>", "</inner>", "<outer>", "</outer>"]);
    }

    #[test]
    fn test_decode_wide_text() {
        let utf16 = "aü€".encode_utf16().flat_map(u16::to_le_bytes).collect::<Vec<_>>();
        let utf32 = "aü€".chars().flat_map(|x| (x as u32).to_le_bytes()).collect::<Vec<_>>();

        assert_eq!(decode_text(&utf16, 2).unwrap(), "aü€");
        assert_eq!(decode_text(&utf32, 4).unwrap(), "aü€");
        assert!(decode_text(&utf32[..5], 4).is_err());
    }
}
