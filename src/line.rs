//! A single `<line>` of coverage information.

use std::io::Write;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Writer;

use crate::error::{MergeError, Result};
use crate::properties::Properties;

/// What kind of coverable element a line represents, from its Clover `type`
/// attribute. Lines with no `type` count as statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Statement,
    Conditional,
    Method,
}

/// One source line's hit count plus its other attributes (num, type,
/// signature, complexity, ...). The `count` attribute is tracked separately
/// and never appears in `properties`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    count: u64,
    properties: Properties,
}

impl Line {
    pub fn new(properties: Properties, count: u64) -> Self {
        Line { count, properties }
    }

    /// Construct from a `<line>` element. The `count` attribute is required;
    /// a non-numeric value coerces to 0.
    pub fn from_xml(element: &BytesStart) -> Result<Self> {
        let mut properties = Properties::from_xml(element)?;
        let count = properties.remove("count").ok_or_else(|| {
            MergeError::Parse("Unable to parse line, missing count attribute.".to_string())
        })?;
        let count = count.trim().parse().unwrap_or(0);
        Ok(Line { count, properties })
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// The line number attribute, used by the parent file as this line's
    /// identity when merging.
    pub fn number(&self) -> Option<&str> {
        self.properties.get("num")
    }

    pub fn kind(&self) -> LineKind {
        match self.properties.get("type") {
            Some("cond") => LineKind::Conditional,
            Some("method") => LineKind::Method,
            _ => LineKind::Statement,
        }
    }

    /// Merge another line into this one. Counts always sum, whatever the
    /// document-level merge mode; this line's properties win on collision.
    pub fn merge(&mut self, other: Line) {
        self.properties.merge_under(other.properties);
        self.count += other.count;
    }

    /// Emit as a self-closing `<line>` element, properties in insertion
    /// order with `count` last.
    pub fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut element = BytesStart::new("line");
        for (key, value) in self.properties.iter() {
            element.push_attribute((key, value));
        }
        element.push_attribute(("count", self.count.to_string().as_str()));
        writer.write_event(Event::Empty(element))?;
        Ok(())
    }
}
