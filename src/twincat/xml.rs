//! Lossless XML document editing
//!
//! TwinCAT files are kept as a flat list of quick-xml events. Edits replace
//! or splice events, and everything that is not touched (comments, CDATA
//! blocks, attribute order, whitespace) is written back byte for byte. This
//! keeps diffs in the released commit down to the lines that actually change.
//!
//! Elements are addressed by their index in the event list and matched by
//! local name, so namespace prefixes and default namespaces are irrelevant.

use crate::core::error::{ReleaseError, ReleaseResult, ResultExt};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct XmlDocument {
  events: Vec<Event<'static>>,
}

impl XmlDocument {
  /// Parse a document; a leading byte-order mark is dropped
  pub fn parse(text: &str) -> ReleaseResult<Self> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let doc = Self {
      events: read_events(text)?,
    };

    if doc.root().is_none() {
      return Err(ReleaseError::message("XML document has no root element"));
    }

    Ok(doc)
  }

  pub fn load(path: &Path) -> ReleaseResult<Self> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
  }

  /// Serialize, adding an XML declaration if the document had none
  pub fn to_xml_string(&self) -> ReleaseResult<String> {
    let mut writer = Writer::new(Vec::new());

    if !matches!(self.events.first(), Some(Event::Decl(_))) {
      writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
      writer.get_mut().extend_from_slice(self.line_ending().as_bytes());
    }
    for event in &self.events {
      writer.write_event(event.borrow())?;
    }

    Ok(String::from_utf8(writer.into_inner())?)
  }

  pub fn save(&self, path: &Path) -> ReleaseResult<()> {
    let content = self.to_xml_string()?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
  }

  /// Index of the root element
  pub fn root(&self) -> Option<usize> {
    self.events.iter().position(|e| element_start(e).is_some())
  }

  /// Index of the first element with this local name, anywhere in the tree
  pub fn find_element(&self, name: &str) -> Option<usize> {
    self
      .events
      .iter()
      .position(|e| element_start(e).is_some_and(|s| has_local_name(s, name)))
  }

  /// Index of the first `name` element whose direct parent is a `parent`
  /// element, optionally also requiring an attribute value
  pub fn find_in_parent(&self, parent: &str, name: &str, attr: Option<(&str, &str)>) -> ReleaseResult<Option<usize>> {
    let mut parents: Vec<Vec<u8>> = Vec::new();

    for (idx, event) in self.events.iter().enumerate() {
      match event {
        Event::Start(start) | Event::Empty(start) => {
          let under_parent = parents.last().is_some_and(|p| p.as_slice() == parent.as_bytes());
          if under_parent && has_local_name(start, name) {
            let matches = match attr {
              None => true,
              Some((key, value)) => self.attribute(idx, key)?.as_deref() == Some(value),
            };
            if matches {
              return Ok(Some(idx));
            }
          }
          if matches!(event, Event::Start(_)) {
            parents.push(start.local_name().as_ref().to_vec());
          }
        }
        Event::End(_) => {
          parents.pop();
        }
        _ => {}
      }
    }

    Ok(None)
  }

  /// Text content of an element (character data directly inside it)
  pub fn text(&self, idx: usize) -> ReleaseResult<Option<String>> {
    let Some(children) = self.children_range(idx) else {
      return Ok(None);
    };

    let mut text = String::new();
    let mut depth = 0usize;
    for event in &self.events[children] {
      match event {
        Event::Start(_) => depth += 1,
        Event::End(_) => depth = depth.saturating_sub(1),
        Event::Text(t) if depth == 0 => text.push_str(&t.unescape()?),
        Event::CData(c) if depth == 0 => text.push_str(&String::from_utf8_lossy(c)),
        _ => {}
      }
    }

    Ok(Some(text))
  }

  /// Replace everything inside an element with a single text node
  pub fn set_text(&mut self, idx: usize, text: &str) -> ReleaseResult<()> {
    self.replace_children(idx, Event::Text(BytesText::new(text).into_owned()))
  }

  /// Replace everything inside an element with a single CDATA block
  pub fn set_cdata(&mut self, idx: usize, text: &str) -> ReleaseResult<()> {
    self.replace_children(idx, Event::CData(BytesCData::new(text).into_owned()))
  }

  /// Unescaped attribute value
  pub fn attribute(&self, idx: usize, key: &str) -> ReleaseResult<Option<String>> {
    let Some(start) = self.events.get(idx).and_then(element_start) else {
      return Ok(None);
    };

    for attr in start.attributes() {
      let attr = attr?;
      if attr.key.as_ref() == key.as_bytes() {
        return Ok(Some(attr.unescape_value()?.into_owned()));
      }
    }

    Ok(None)
  }

  /// Set (or add) an attribute, keeping the order of the others
  pub fn set_attribute(&mut self, idx: usize, key: &str, value: &str) -> ReleaseResult<()> {
    let (start, empty) = match self.events.get(idx) {
      Some(Event::Start(start)) => (start, false),
      Some(Event::Empty(start)) => (start, true),
      _ => return Err(ReleaseError::message(format!("Event {} is not an element", idx))),
    };

    let name = String::from_utf8(start.name().as_ref().to_vec())?;
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut replaced = false;
    for attr in start.attributes() {
      let attr = attr?;
      let attr_key = String::from_utf8(attr.key.as_ref().to_vec())?;
      if attr_key == key {
        replaced = true;
        pairs.push((attr_key, value.to_string()));
      } else {
        pairs.push((attr_key, attr.unescape_value()?.into_owned()));
      }
    }
    if !replaced {
      pairs.push((key.to_string(), value.to_string()));
    }

    let mut updated = BytesStart::new(name);
    for (k, v) in &pairs {
      updated.push_attribute((k.as_str(), v.as_str()));
    }
    self.events[idx] = if empty { Event::Empty(updated) } else { Event::Start(updated) };
    Ok(())
  }

  /// Line separator the document uses, taken from its first line break
  pub fn line_ending(&self) -> &'static str {
    let first_break = self.events.iter().find_map(|event| match event {
      Event::Text(t) => t.iter().position(|b| *b == b'\n').map(|pos| pos > 0 && t[pos - 1] == b'\r'),
      _ => None,
    });
    if first_break == Some(true) { "\r\n" } else { "\n" }
  }

  /// Whitespace at the start of the line an element sits on
  pub fn indentation_of(&self, idx: usize) -> String {
    match idx.checked_sub(1).and_then(|prev| self.events.get(prev)) {
      Some(Event::Text(t)) => {
        let raw = String::from_utf8_lossy(t);
        let line = raw.rsplit('\n').next().unwrap_or("");
        if line.chars().all(char::is_whitespace) {
          line.to_string()
        } else {
          String::new()
        }
      }
      _ => String::new(),
    }
  }

  /// Insert a fragment as the next sibling of an element, on its own line
  /// with the same indentation
  pub fn insert_after(&mut self, idx: usize, fragment: &str) -> ReleaseResult<()> {
    let indent = self.indentation_of(idx);
    let end = self.end_of(idx)?;

    let mut inserted = vec![whitespace(&format!("{}{}", self.line_ending(), indent))];
    inserted.extend(read_events(fragment)?);
    self.events.splice(end + 1..end + 1, inserted);
    Ok(())
  }

  /// Append a fragment as the last child of an element, one level deeper
  pub fn append_child(&mut self, idx: usize, fragment: &str) -> ReleaseResult<()> {
    if !matches!(self.events.get(idx), Some(Event::Start(_))) {
      return Err(ReleaseError::message(format!("Event {} cannot take children", idx)));
    }

    let child_indent = format!("{}  ", self.indentation_of(idx));
    let end = self.end_of(idx)?;
    // Keep the whitespace that puts the closing tag on its own line last
    let pos = match self.events.get(end - 1) {
      Some(Event::Text(t)) if t.iter().all(u8::is_ascii_whitespace) && end - 1 > idx => end - 1,
      _ => end,
    };

    let mut inserted = vec![whitespace(&format!("{}{}", self.line_ending(), child_indent))];
    inserted.extend(read_events(fragment)?);
    self.events.splice(pos..pos, inserted);
    Ok(())
  }

  /// Count elements matching `name` under `parent` whose `key` attribute
  /// satisfies `accept`
  pub fn count_in_parent(
    &self,
    parent: &str,
    name: &str,
    key: &str,
    accept: impl Fn(&str) -> bool,
  ) -> ReleaseResult<usize> {
    let mut count = 0;
    let mut parents: Vec<Vec<u8>> = Vec::new();

    for (idx, event) in self.events.iter().enumerate() {
      match event {
        Event::Start(start) | Event::Empty(start) => {
          let under_parent = parents.last().is_some_and(|p| p.as_slice() == parent.as_bytes());
          if under_parent && has_local_name(start, name) && self.attribute(idx, key)?.is_some_and(|v| accept(&v)) {
            count += 1;
          }
          if matches!(event, Event::Start(_)) {
            parents.push(start.local_name().as_ref().to_vec());
          }
        }
        Event::End(_) => {
          parents.pop();
        }
        _ => {}
      }
    }

    Ok(count)
  }

  /// Index of the event closing the element at `idx` (itself if empty)
  fn end_of(&self, idx: usize) -> ReleaseResult<usize> {
    match self.events.get(idx) {
      Some(Event::Empty(_)) => return Ok(idx),
      Some(Event::Start(_)) => {}
      _ => return Err(ReleaseError::message(format!("Event {} is not an element", idx))),
    }

    let mut depth = 0usize;
    for (offset, event) in self.events[idx..].iter().enumerate() {
      match event {
        Event::Start(_) => depth += 1,
        Event::End(_) => {
          depth -= 1;
          if depth == 0 {
            return Ok(idx + offset);
          }
        }
        _ => {}
      }
    }

    Err(ReleaseError::message("Unbalanced XML element"))
  }

  fn children_range(&self, idx: usize) -> Option<std::ops::Range<usize>> {
    match self.events.get(idx)? {
      Event::Empty(_) => Some(idx + 1..idx + 1),
      Event::Start(_) => self.end_of(idx).ok().map(|end| idx + 1..end),
      _ => None,
    }
  }

  fn replace_children(&mut self, idx: usize, content: Event<'static>) -> ReleaseResult<()> {
    match self.events.get(idx) {
      Some(Event::Empty(start)) => {
        let start = start.clone();
        let end = BytesEnd::new(String::from_utf8(start.name().as_ref().to_vec())?);
        self.events.splice(idx..=idx, [Event::Start(start), content, Event::End(end)]);
        Ok(())
      }
      Some(Event::Start(_)) => {
        let end = self.end_of(idx)?;
        self.events.splice(idx + 1..end, [content]);
        Ok(())
      }
      _ => Err(ReleaseError::message(format!("Event {} is not an element", idx))),
    }
  }
}

fn read_events(text: &str) -> ReleaseResult<Vec<Event<'static>>> {
  let mut reader = Reader::from_str(text);
  reader.config_mut().trim_text(false);

  let mut events = Vec::new();
  loop {
    match reader.read_event()? {
      Event::Eof => break,
      event => events.push(event.into_owned()),
    }
  }
  Ok(events)
}

fn element_start<'a>(event: &'a Event<'static>) -> Option<&'a BytesStart<'static>> {
  match event {
    Event::Start(start) | Event::Empty(start) => Some(start),
    _ => None,
  }
}

fn has_local_name(start: &BytesStart<'_>, name: &str) -> bool {
  start.local_name().as_ref() == name.as_bytes()
}

fn whitespace(text: &str) -> Event<'static> {
  Event::Text(BytesText::from_escaped(text.to_string()))
}
