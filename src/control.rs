// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! deb822 control file primitives.

Release and Packages manifests are both *control files*: an ordered series of
*paragraphs*, each an ordered series of `Name: value` *fields*. See
<https://www.debian.org/doc/debian-policy/ch-controlfields.html>.
*/

use {
    crate::error::{Error, Result},
    std::{borrow::Cow, io::BufRead},
};

/// A field value, after the colon.
///
/// *Simple* values are a single line. *Folded* values are logically a single line spanning
/// multiple physical lines, where whitespace is not significant. *Multiline* values have
/// syntax similar to folded but whitespace (in particular, the three-column
/// `digest size path` rows of the hash tables) is significant.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ControlFieldValue<'a> {
    Simple(Cow<'a, str>),
    Folded(Cow<'a, str>),
    Multiline(Cow<'a, str>),
}

impl<'a> ControlFieldValue<'a> {
    /// Iterate over the logical lines of this value, with leading whitespace trimmed.
    pub fn iter_lines(&self) -> impl Iterator<Item = &str> {
        let value: &str = match self {
            Self::Simple(v) => v,
            Self::Folded(v) => v,
            Self::Multiline(v) => v,
        };
        value.lines().map(|x| x.trim_start())
    }
}

/// A single `Name: value` field in a control paragraph.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ControlField<'a> {
    name: Cow<'a, str>,
    value: Cow<'a, str>,
}

impl<'a> ControlField<'a> {
    pub fn new(name: Cow<'a, str>, value: Cow<'a, str>) -> Self {
        Self { name, value }
    }

    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// The raw value, including embedded newlines and leading whitespace of continuation lines.
    pub fn value_str(&self) -> &str {
        self.value.as_ref()
    }

    pub fn as_multiline(&self) -> ControlFieldValue<'a> {
        ControlFieldValue::Multiline(self.value.clone())
    }

    pub fn as_folded(&self) -> ControlFieldValue<'a> {
        ControlFieldValue::Folded(self.value.clone())
    }
}

/// A paragraph: an ordered, case-insensitively-keyed set of fields.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ControlParagraph<'a> {
    fields: Vec<ControlField<'a>>,
}

impl<'a> ControlParagraph<'a> {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn set_field_from_string(&mut self, name: Cow<'a, str>, value: Cow<'a, str>) {
        self.fields
            .retain(|cf| !cf.name.eq_ignore_ascii_case(name.as_ref()));
        self.fields.push(ControlField::new(name, value));
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field(&self, name: &str) -> Option<&ControlField<'a>> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.value_str())
    }

    pub fn required_field_str(&self, name: &'static str) -> Result<&str> {
        self.field_str(name)
            .ok_or(Error::ControlRequiredFieldMissing(name))
    }

    /// A field's value interpreted as a boolean; true iff the value is exactly `yes`.
    pub fn field_bool(&self, name: &str) -> bool {
        matches!(self.field_str(name), Some("yes"))
    }

    pub fn field_multiline(&self, name: &str) -> Option<ControlFieldValue<'a>> {
        self.field(name).map(|cf| cf.as_multiline())
    }

    pub fn field_folded(&self, name: &str) -> Option<ControlFieldValue<'a>> {
        self.field(name).map(|cf| cf.as_folded())
    }

    /// Whitespace-separated words of a field's value, e.g. `Architectures`.
    pub fn field_words(&self, name: &str) -> Vec<String> {
        self.field_str(name)
            .map(|v| v.split_whitespace().map(|w| w.to_string()).collect())
            .unwrap_or_default()
    }

    pub fn iter_fields(&self) -> impl Iterator<Item = &ControlField<'a>> {
        self.fields.iter()
    }
}

/// Incremental parser state for a single control file, fed one line at a time.
#[derive(Clone, Debug, Default)]
pub struct ControlFileParser {
    paragraph: ControlParagraph<'static>,
    field: Option<String>,
}

impl ControlFileParser {
    /// Feed a line (including its trailing newline, if any). Returns a completed paragraph
    /// if this line terminated one.
    pub fn write_line(&mut self, line: &str) -> Result<Option<ControlParagraph<'static>>> {
        let is_empty_line = line.trim().is_empty();
        let is_indented = line.starts_with(' ') && line.len() > 1;

        let current_field = self.field.take();

        if is_empty_line {
            if let Some(field) = current_field {
                self.flush_field(field)?;
            }

            return Ok(if self.paragraph.is_empty() {
                None
            } else {
                let para = std::mem::take(&mut self.paragraph);
                Some(para)
            });
        }

        match (current_field, is_indented) {
            (Some(v), false) => {
                self.flush_field(v)?;
                self.field = Some(line.to_string());
                Ok(None)
            }
            (None, _) => {
                self.field = Some(line.to_string());
                Ok(None)
            }
            (Some(v), true) => {
                self.field = Some(v + line);
                Ok(None)
            }
        }
    }

    pub fn finish(mut self) -> Result<Option<ControlParagraph<'static>>> {
        if let Some(field) = self.field.take() {
            self.flush_field(field)?;
        }

        Ok(if self.paragraph.is_empty() {
            None
        } else {
            Some(self.paragraph)
        })
    }

    fn flush_field(&mut self, v: String) -> Result<()> {
        let mut parts = v.splitn(2, ':');

        let name = parts
            .next()
            .ok_or_else(|| Error::ControlParseError(format!("missing colon in line '{v}'")))?;
        let value = parts
            .next()
            .ok_or_else(|| Error::ControlParseError(format!("could not detect value in '{v}'")))?
            .trim_end_matches(['\n', '\r']);
        // Multiline/folded fields have nothing between the colon and the newline that
        // ends the `Name:` line itself; drop it so continuation lines aren't preceded
        // by a spurious empty line.
        let value = value.strip_prefix('\n').unwrap_or(value);
        let value = value.strip_prefix(' ').unwrap_or(value);

        self.paragraph
            .set_field_from_string(Cow::Owned(name.to_string()), Cow::Owned(value.to_string()));

        Ok(())
    }
}

/// A streaming reader of [ControlParagraph] values from a buffered byte source.
///
/// Used for both Release (exactly one paragraph expected by callers) and Packages
/// (zero or more paragraphs) manifests, so a multi-megabyte Packages index need not be
/// fully parsed before its first record is available.
pub struct ControlParagraphReader<R: BufRead> {
    reader: R,
    parser: Option<ControlFileParser>,
}

impl<R: BufRead> ControlParagraphReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: Some(ControlFileParser::default()),
        }
    }

    fn get_next(&mut self) -> Result<Option<ControlParagraph<'static>>> {
        let mut parser = self.parser.take().unwrap();

        loop {
            let mut line = String::new();
            let bytes_read = self.reader.read_line(&mut line)?;

            if bytes_read != 0 {
                if let Some(paragraph) = parser.write_line(&line)? {
                    self.parser.replace(parser);
                    return Ok(Some(paragraph));
                }
            } else {
                return Ok(parser.finish()?);
            }
        }
    }
}

impl<R: BufRead> Iterator for ControlParagraphReader<R> {
    type Item = Result<ControlParagraph<'static>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.parser.is_none() {
            None
        } else {
            match self.get_next() {
                Ok(Some(para)) => Some(Ok(para)),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        }
    }
}

/// Parse a control file expected to contain exactly one paragraph (a Release manifest).
pub fn parse_single_paragraph(data: &[u8]) -> Result<ControlParagraph<'static>> {
    let paragraphs =
        ControlParagraphReader::new(std::io::Cursor::new(data)).collect::<Result<Vec<_>>>()?;

    if paragraphs.len() != 1 {
        return Err(Error::ReleaseControlParagraphMismatch(paragraphs.len()));
    }

    Ok(paragraphs.into_iter().next().unwrap())
}
