//! Structural nodes of a Clover document.
//!
//! Clover XML structure:
//!
//!   <coverage generated="..." clover="4.x.x">
//!     <project timestamp="..." name="...">
//!       <package name="...">
//!         <file name="Foo.php" path="/absolute/path/to/Foo.php">
//!           <line num="1" count="5" type="stmt"/>
//!           <line num="3" count="2" type="method" signature="doStuff()"/>
//!         </file>
//!       </package>
//!       <file name="Bare.php">...</file>
//!     </project>
//!   </coverage>
//!
//! Each level is a keyed, insertion-ordered collection of its children:
//! packages by name, files by name (or path), lines by their `num`
//! attribute. Merging two same-identity nodes is a union of child keys, with
//! collisions resolved per the configured [`MergeMode`].

use std::collections::HashMap;
use std::io::Write;

use chrono::Utc;
use log::{debug, warn};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::accumulator::MergeMode;
use crate::error::{MergeError, Result};
use crate::line::Line;
use crate::metrics::Metrics;
use crate::properties::Properties;

/// A `<file>` element: its attribute bag plus its lines, keyed by line
/// number. At most one line per distinct number.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    name: String,
    properties: Properties,
    lines: Vec<Line>,
    line_index: HashMap<String, usize>,
}

impl File {
    /// Construct from a `<file>` element's attributes. The identity key is
    /// the `name` attribute, falling back to `path`.
    pub fn new(properties: Properties) -> Result<Self> {
        let name = properties
            .get("name")
            .or_else(|| properties.get("path"))
            .map(str::to_string)
            .ok_or_else(|| {
                MergeError::Parse("Unable to parse file, missing name attribute.".to_string())
            })?;
        Ok(File {
            name,
            properties,
            lines: Vec::new(),
            line_index: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, number: &str) -> Option<&Line> {
        self.line_index.get(number).map(|&index| &self.lines[index])
    }

    /// Add a line. A line whose number is already present is combined with
    /// the existing one (or discarded in exclusive mode); a line with no
    /// `num` attribute has no identity and is always kept as-is.
    pub fn push_line(&mut self, line: Line, mode: MergeMode) {
        match line.number().map(str::to_string) {
            Some(number) => match self.line_index.get(&number) {
                Some(&index) => {
                    if mode != MergeMode::Exclusive {
                        self.lines[index].merge(line);
                    }
                }
                None => {
                    self.line_index.insert(number, self.lines.len());
                    self.lines.push(line);
                }
            },
            None => {
                warn!("Keeping line without a num attribute in {}.", self.name);
                self.lines.push(line);
            }
        }
    }

    /// Merge a same-name file into this one: this file's attributes win,
    /// lines union with collisions resolved per mode.
    pub fn merge(&mut self, other: File, mode: MergeMode) {
        self.properties.merge_under(other.properties);
        for line in other.lines {
            self.push_line(line, mode);
        }
    }

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>, metrics: &mut Metrics) -> Result<()> {
        metrics.record_file();
        let mut element = BytesStart::new("file");
        for (key, value) in self.properties.iter() {
            element.push_attribute((key, value));
        }
        if self.lines.is_empty() {
            writer.write_event(Event::Empty(element))?;
        } else {
            writer.write_event(Event::Start(element))?;
            for line in &self.lines {
                metrics.record_line(line);
                line.write_xml(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new("file")))?;
        }
        Ok(())
    }
}

/// A `<package>` element: name, attribute bag and files keyed by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    name: String,
    properties: Properties,
    files: Vec<File>,
    file_index: HashMap<String, usize>,
}

impl Package {
    pub fn new(properties: Properties) -> Result<Self> {
        let name = properties.get("name").map(str::to_string).ok_or_else(|| {
            MergeError::Parse("Unable to parse package, missing name attribute.".to_string())
        })?;
        Ok(Package {
            name,
            properties,
            files: Vec::new(),
            file_index: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn file(&self, name: &str) -> Option<&File> {
        self.file_index.get(name).map(|&index| &self.files[index])
    }

    /// Add a file. On an identity collision the incoming file is merged in,
    /// or discarded outright in exclusive mode (first-seen wins).
    pub fn push_file(&mut self, file: File, mode: MergeMode) {
        match self.file_index.get(file.name()) {
            Some(&index) => {
                if mode != MergeMode::Exclusive {
                    self.files[index].merge(file, mode);
                }
            }
            None => {
                self.file_index
                    .insert(file.name().to_string(), self.files.len());
                self.files.push(file);
            }
        }
    }

    pub fn merge(&mut self, other: Package, mode: MergeMode) {
        self.properties.merge_under(other.properties);
        for file in other.files {
            self.push_file(file, mode);
        }
    }

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>, metrics: &mut Metrics) -> Result<()> {
        let mut element = BytesStart::new("package");
        for (key, value) in self.properties.iter() {
            element.push_attribute((key, value));
        }
        if self.files.is_empty() {
            writer.write_event(Event::Empty(element))?;
        } else {
            writer.write_event(Event::Start(element))?;
            for file in &self.files {
                file.write_xml(writer, metrics)?;
            }
            writer.write_event(Event::End(BytesEnd::new("package")))?;
        }
        Ok(())
    }
}

/// One parsed input document, and also the working tree of a merge run:
/// packages keyed by name plus any files sitting directly under the project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    packages: Vec<Package>,
    package_index: HashMap<String, usize>,
    files: Vec<File>,
    file_index: HashMap<String, usize>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whole Clover document. The root element must be `<coverage>`;
    /// `<package>`, `<file>` and `<line>` are recognized anywhere below it
    /// and anything else (`project`, `metrics`, `class`, ...) is skipped.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut document = Document::new();
        let mut root_seen = false;
        let mut current_package: Option<Package> = None;
        let mut current_file: Option<File> = None;

        loop {
            let event = reader.read_event_into(&mut buf);
            let is_start = matches!(&event, Ok(Event::Start(_)));
            match event {
                Err(source) => {
                    return Err(MergeError::XmlAt {
                        source,
                        position: reader.buffer_position(),
                    })
                }
                Ok(Event::Eof) => break,
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if !root_seen {
                        if e.name().as_ref() != b"coverage" {
                            return Err(MergeError::Parse(
                                "Unable to parse document, expected a coverage root element."
                                    .to_string(),
                            ));
                        }
                        root_seen = true;
                    } else {
                        match e.name().as_ref() {
                            b"package" => {
                                let package = Package::new(Properties::from_xml(e)?)?;
                                if is_start {
                                    current_package = Some(package);
                                } else {
                                    document.push_package(package, MergeMode::Inclusive);
                                }
                            }
                            b"file" => {
                                let file = File::new(Properties::from_xml(e)?)?;
                                if is_start {
                                    current_file = Some(file);
                                } else {
                                    match current_package.as_mut() {
                                        Some(package) => {
                                            package.push_file(file, MergeMode::Inclusive)
                                        }
                                        None => document.push_file(file, MergeMode::Inclusive),
                                    }
                                }
                            }
                            b"line" => {
                                let line = Line::from_xml(e)?;
                                match current_file.as_mut() {
                                    Some(file) => file.push_line(line, MergeMode::Inclusive),
                                    None => warn!("Ignoring line outside of any file element."),
                                }
                            }
                            b"coverage" | b"project" | b"metrics" | b"class" => {}
                            other => {
                                debug!(
                                    "Ignoring unknown element: {}",
                                    String::from_utf8_lossy(other)
                                );
                            }
                        }
                    }
                }
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"file" => {
                        if let Some(file) = current_file.take() {
                            match current_package.as_mut() {
                                Some(package) => package.push_file(file, MergeMode::Inclusive),
                                None => document.push_file(file, MergeMode::Inclusive),
                            }
                        }
                    }
                    b"package" => {
                        if let Some(package) = current_package.take() {
                            document.push_package(package, MergeMode::Inclusive);
                        }
                    }
                    _ => {}
                },
                Ok(_) => {}
            }
            buf.clear();
        }

        Ok(document)
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.package_index
            .get(name)
            .map(|&index| &self.packages[index])
    }

    /// Files sitting directly under the project, outside any package.
    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn file(&self, name: &str) -> Option<&File> {
        self.file_index.get(name).map(|&index| &self.files[index])
    }

    /// Add a package. Same-name packages always merge structurally; the
    /// merge mode only governs what happens to colliding files and lines
    /// inside them.
    pub fn push_package(&mut self, package: Package, mode: MergeMode) {
        match self.package_index.get(package.name()) {
            Some(&index) => self.packages[index].merge(package, mode),
            None => {
                self.package_index
                    .insert(package.name().to_string(), self.packages.len());
                self.packages.push(package);
            }
        }
    }

    /// Add a top-level file, with the same collision rules as inside a
    /// package.
    pub fn push_file(&mut self, file: File, mode: MergeMode) {
        match self.file_index.get(file.name()) {
            Some(&index) => {
                if mode != MergeMode::Exclusive {
                    self.files[index].merge(file, mode);
                }
            }
            None => {
                self.file_index
                    .insert(file.name().to_string(), self.files.len());
                self.files.push(file);
            }
        }
    }

    /// Merge another document into this one. Children only present on one
    /// side are kept as-is; colliding identities follow the mode.
    pub fn merge(&mut self, other: Document, mode: MergeMode) {
        for package in other.packages {
            self.push_package(package, mode);
        }
        for file in other.files {
            self.push_file(file, mode);
        }
    }

    /// Serialize to a Clover document, computing [`Metrics`] in the same
    /// traversal. The `generated`/`timestamp` wrapper attributes are
    /// regenerated rather than carried over from any input.
    pub fn to_xml(&self) -> Result<(String, Metrics)> {
        let mut metrics = Metrics::new();
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let now = Utc::now().timestamp().to_string();

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut coverage = BytesStart::new("coverage");
        coverage.push_attribute(("generated", now.as_str()));
        writer.write_event(Event::Start(coverage))?;

        let mut project = BytesStart::new("project");
        project.push_attribute(("timestamp", now.as_str()));
        if self.packages.is_empty() && self.files.is_empty() {
            writer.write_event(Event::Empty(project))?;
        } else {
            writer.write_event(Event::Start(project))?;
            for package in &self.packages {
                package.write_xml(&mut writer, &mut metrics)?;
            }
            for file in &self.files {
                file.write_xml(&mut writer, &mut metrics)?;
            }
            writer.write_event(Event::End(BytesEnd::new("project")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("coverage")))?;

        let mut out = writer.into_inner();
        out.push(b'\n');
        Ok((String::from_utf8_lossy(&out).into_owned(), metrics))
    }
}
