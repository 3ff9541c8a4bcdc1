use std::io::Write;

use super::walker::{walk, DocumentVisitor, Element};
use crate::Result;

/// Renders a serialized project document as indented XML text.
pub fn write_xml<W: Write>(raw_document: &[u8], out: W) -> Result<()> {
    let mut writer = XmlWriter {
        out,
        depth: 0,
        start_open: false,
        inline: false,
    };
    walk(raw_document, &mut writer)?;
    writer.out.flush()?;
    Ok(())
}

struct XmlWriter<W> {
    out: W,
    depth: usize,
    // the last start tag still lacks its closing '>'
    start_open: bool,
    inline: bool,
}

impl<W: Write> XmlWriter<W> {
    fn close_start(&mut self, newline: bool) -> Result<()> {
        if self.start_open {
            self.start_open = false;
            self.out.write_all(if newline { b">\n" } else { b">" })?;
        }
        Ok(())
    }

    fn indent(&mut self) -> Result<()> {
        for _ in 0..self.depth {
            self.out.write_all(b"\t")?;
        }
        Ok(())
    }
}

impl<W: Write> DocumentVisitor for XmlWriter<W> {
    fn start_element(&mut self, element: &Element) -> Result<()> {
        self.close_start(true)?;
        self.indent()?;
        write!(self.out, "<{}", element.name)?;
        for (name, value) in &element.attributes {
            write!(self.out, " {}=\"{}\"", name, escape(&value.to_string()))?;
        }
        self.start_open = true;
        self.inline = false;
        self.depth += 1;
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<()> {
        self.depth -= 1;
        if self.start_open {
            self.start_open = false;
            self.out.write_all(b"/>\n")?;
            return Ok(());
        }
        if !self.inline {
            self.indent()?;
        }
        self.inline = false;
        writeln!(self.out, "</{}>", name)?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.close_start(false)?;
        self.inline = true;
        self.out.write_all(escape(text).as_bytes())?;
        Ok(())
    }

    fn raw(&mut self, text: &str) -> Result<()> {
        self.close_start(true)?;
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
