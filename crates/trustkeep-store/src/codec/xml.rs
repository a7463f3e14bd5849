//! XML property-list markup for [`TrustPolicyDocument`].
//!
//! The reader does not build a generic plist tree. It walks the event stream
//! and drops values into the document's columns by nesting level, so the
//! per-entry dictionaries collapse into the flat `dates`/`data` sequences.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::path::Path;
use tracing::debug;

use trustkeep_core::{Result, TrustError};

use super::document::{
    TrustPolicyDocument, ISSUER_NAME_KEY, MOD_DATE_KEY, SERIAL_NUMBER_KEY, TRUST_LIST_KEY,
    TRUST_RESULT_KEY, TRUST_SETTINGS_KEY, TRUST_VERSION_KEY,
};

const PLIST_DOCTYPE: &str = r#"plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd""#;

/// Serialize a document as an XML property list.
pub fn to_xml(doc: &TrustPolicyDocument) -> Result<Vec<u8>> {
    doc.validate()?;

    let mut w = PlistWriter::new();
    w.prologue()?;
    w.open("plist")?;
    w.open("dict")?;

    w.leaf("key", TRUST_LIST_KEY)?;
    w.open("dict")?;
    let columns = &doc.trust_list.columns;
    for (i, key) in doc.trust_list.keys.iter().enumerate() {
        let (issuer, serial) = doc
            .data_pair(i)
            .ok_or_else(|| TrustError::decode(format!("entry {i} has no data pair")))?;

        w.leaf("key", key)?;
        w.open("dict")?;
        w.leaf("key", ISSUER_NAME_KEY)?;
        w.leaf("data", issuer)?;
        w.leaf("key", MOD_DATE_KEY)?;
        w.leaf("date", &columns.dates[i])?;
        w.leaf("key", SERIAL_NUMBER_KEY)?;
        w.leaf("data", serial)?;
        if let Some(result) = doc.result(i) {
            w.leaf("key", TRUST_SETTINGS_KEY)?;
            w.open("array")?;
            w.open("dict")?;
            w.leaf("key", TRUST_RESULT_KEY)?;
            w.leaf("integer", &result.to_string())?;
            w.close("dict")?;
            w.close("array")?;
        }
        w.close("dict")?;
    }
    w.close("dict")?;

    if let Some(version) = doc.trust_version {
        w.leaf("key", TRUST_VERSION_KEY)?;
        w.leaf("integer", &version.to_string())?;
    }

    w.close("dict")?;
    w.close("plist")?;
    Ok(w.finish())
}

/// Parse an XML property list into a document.
///
/// Column lengths are not checked here; [`super::decode`] does that.
pub fn from_xml(bytes: &[u8]) -> Result<TrustPolicyDocument> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut parser = PlistParser::default();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            TrustError::decode(format!(
                "policy xml at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(e) => parser.open(tag_name(&e)),
            Event::End(_) => parser.close()?,
            Event::Empty(e) => {
                parser.open(tag_name(&e));
                parser.close()?;
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| TrustError::decode(format!("policy xml text: {e}")))?;
                parser.text(&text);
            }
            Event::CData(c) => parser.text(&String::from_utf8_lossy(&c.into_inner())),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    parser.finish()
}

/// Read and parse a policy file written by the native tool or [`write_policy_file`].
pub async fn read_policy_file(path: &Path) -> Result<TrustPolicyDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TrustError::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "read policy file");
    from_xml(&bytes)
}

/// Serialize a document to `path`, replacing any existing file.
pub async fn write_policy_file(path: &Path, doc: &TrustPolicyDocument) -> Result<()> {
    let bytes = to_xml(doc)?;
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| TrustError::io(path, e))?;
    debug!(path = %path.display(), entries = doc.len(), "wrote policy file");
    Ok(())
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn write_failed(e: impl std::fmt::Display) -> TrustError {
    TrustError::decode(format!("policy xml write: {e}"))
}

struct PlistWriter {
    inner: Writer<Vec<u8>>,
}

impl PlistWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b'\t', 1),
        }
    }

    fn prologue(&mut self) -> Result<()> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_failed)?;
        self.inner
            .write_event(Event::DocType(BytesText::from_escaped(PLIST_DOCTYPE)))
            .map_err(write_failed)
    }

    fn open(&mut self, tag: &str) -> Result<()> {
        let start = if tag == "plist" {
            BytesStart::new(tag).with_attributes([("version", "1.0")])
        } else {
            BytesStart::new(tag)
        };
        self.inner
            .write_event(Event::Start(start))
            .map_err(write_failed)
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        self.inner
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(write_failed)
    }

    fn leaf(&mut self, tag: &str, text: &str) -> Result<()> {
        self.inner
            .create_element(tag)
            .write_text_content(BytesText::new(text))
            .map_err(write_failed)?;
        Ok(())
    }

    fn finish(self) -> Vec<u8> {
        let mut bytes = self.inner.into_inner();
        bytes.push(b'\n');
        bytes
    }
}

/// What an open element means at its position in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Plist,
    Root,
    TrustList,
    Entry,
    /// Anything nested below an entry (trustSettings arrays and dicts)
    InEntry,
    Leaf,
    Ignored,
}

#[derive(Debug)]
struct Frame {
    tag: String,
    role: Role,
    last_key: Option<String>,
    text: String,
}

#[derive(Debug, Default)]
struct PlistParser {
    stack: Vec<Frame>,
    doc: TrustPolicyDocument,
    saw_root: bool,
}

impl PlistParser {
    fn parent_role(&self) -> Option<Role> {
        self.stack.last().map(|f| f.role)
    }

    fn parent_key(&self) -> Option<&str> {
        self.stack.last().and_then(|f| f.last_key.as_deref())
    }

    fn open(&mut self, tag: String) {
        let container = matches!(tag.as_str(), "dict" | "array");
        let role = match (self.parent_role(), tag.as_str()) {
            (None, "plist") => Role::Plist,
            (Some(Role::Plist), "dict") => {
                self.saw_root = true;
                Role::Root
            }
            (Some(Role::Root), "dict") if self.parent_key() == Some(TRUST_LIST_KEY) => {
                Role::TrustList
            }
            (Some(Role::TrustList), "dict") => {
                self.doc.trust_list.columns.results.push(None);
                Role::Entry
            }
            (Some(Role::Entry | Role::InEntry), _) if container => Role::InEntry,
            (_, _) if container => Role::Ignored,
            (_, _) => Role::Leaf,
        };
        self.stack.push(Frame {
            tag,
            role,
            last_key: None,
            text: String::new(),
        });
    }

    fn text(&mut self, text: &str) {
        if let Some(frame) = self.stack.last_mut() {
            if frame.role == Role::Leaf {
                frame.text.push_str(text);
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| TrustError::decode("policy xml: unbalanced closing tag"))?;
        if frame.role != Role::Leaf {
            return Ok(());
        }
        let Some(parent) = self.stack.last_mut() else {
            return Ok(());
        };

        match (parent.role, frame.tag.as_str()) {
            (_, "key") => {
                if parent.role == Role::TrustList {
                    self.doc.trust_list.keys.push(frame.text.clone());
                }
                parent.last_key = Some(frame.text);
            }
            (Role::Entry, "data") => self.doc.trust_list.columns.data.push(frame.text),
            (Role::Entry, "date") => self.doc.trust_list.columns.dates.push(frame.text),
            (Role::Root, "integer") if parent.last_key.as_deref() == Some(TRUST_VERSION_KEY) => {
                self.doc.trust_version = Some(parse_integer(&frame.text)?);
            }
            (Role::InEntry, "integer")
                if parent.last_key.as_deref() == Some(TRUST_RESULT_KEY) =>
            {
                let code = parse_integer(&frame.text)?;
                if let Some(slot) = self.doc.trust_list.columns.results.last_mut() {
                    *slot = Some(code);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(mut self) -> Result<TrustPolicyDocument> {
        if !self.stack.is_empty() {
            return Err(TrustError::decode(format!(
                "policy xml ended with {} unclosed elements",
                self.stack.len()
            )));
        }
        if !self.saw_root {
            return Err(TrustError::decode("policy xml has no root dictionary"));
        }
        if self.doc.trust_list.columns.results.iter().all(Option::is_none) {
            self.doc.trust_list.columns.results.clear();
        }
        Ok(self.doc)
    }
}

fn parse_integer(text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .map_err(|e| TrustError::decode(format!("policy xml integer {text:?}: {e}")))
}
