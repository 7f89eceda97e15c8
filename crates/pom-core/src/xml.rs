//! Generic XML element tree.
//!
//! Uses the quick-xml SAX reader to build a small owned tree that the model
//! builder walks. Element and attribute names are local names: namespace
//! prefixes (and the Maven POM namespace) are dropped.

use crate::error::{PomError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// One XML element with its trimmed text content and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Trimmed, unescaped text directly inside this element. `None` when
    /// the element only holds whitespace or children.
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follows a `/`-separated chain of child names, e.g. `"build/plugins"`.
    pub fn descendant(&self, path: &str) -> Option<&Self> {
        path.split('/')
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(Self::text)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Open element plus its accumulated raw text.
struct Frame {
    element: Element,
    text: String,
}

impl Frame {
    fn finish(mut self) -> Element {
        let trimmed = self.text.trim();
        if !trimmed.is_empty() {
            self.element.text = Some(trimmed.to_string());
        }
        self.element
    }
}

/// Parses an XML document into its root [`Element`].
pub fn parse_document(content: &str) -> Result<Element> {
    let mut reader = Reader::from_str(content);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event()?;

        match event {
            Event::Start(ref e) => {
                ensure_single_root(&root)?;
                stack.push(Frame {
                    element: start_element(e)?,
                    text: String::new(),
                });
            }
            Event::Empty(ref e) => {
                ensure_single_root(&root)?;
                let element = start_element(e)?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    let text = e
                        .decode()
                        .map_err(|err| PomError::XmlParse {
                            message: err.to_string(),
                        })?;
                    frame.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::GeneralRef(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    let name = String::from_utf8_lossy(e).to_string();
                    if let Some(ch) = e.resolve_char_ref().map_err(|err| PomError::XmlParse {
                        message: err.to_string(),
                    })? {
                        frame.text.push(ch);
                    } else if let Some(resolved) =
                        quick_xml::escape::resolve_predefined_entity(&name)
                    {
                        frame.text.push_str(resolved);
                    } else {
                        // Unknown entities are kept verbatim.
                        frame.text.push('&');
                        frame.text.push_str(&name);
                        frame.text.push(';');
                    }
                }
            }
            Event::End(_) => {
                if let Some(frame) = stack.pop() {
                    attach(&mut stack, &mut root, frame.finish());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(PomError::XmlParse {
            message: format!("unexpected end of document inside <{}>", stack[0].element.name),
        });
    }

    root.ok_or_else(|| PomError::XmlParse {
        message: "document has no root element".into(),
    })
}

fn ensure_single_root(root: &Option<Element>) -> Result<()> {
    if root.is_some() {
        return Err(PomError::XmlParse {
            message: "document has more than one root element".into(),
        });
    }
    Ok(())
}

fn attach(stack: &mut [Frame], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.element.children.push(element),
        None => *root = Some(element),
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| PomError::XmlParse {
            message: err.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
        let raw = String::from_utf8_lossy(&attr.value).to_string();
        let value = quick_xml::escape::unescape(&raw)
            .map(|c| c.into_owned())
            .unwrap_or(raw);
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        text: None,
        children: Vec::new(),
    })
}
