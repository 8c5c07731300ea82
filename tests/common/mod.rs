//! Recording handlers shared by the integration tests.
#![allow(dead_code)]

use std::{cell::RefCell, collections::HashMap, io, rc::Rc};

use xscan::{
    config::XmlScanConfig,
    error::{XmlError, XmlErrorHandler, XmlScanError},
    io::{XmlEntityResolver, XmlInputSource, XmlResourceIdentifier},
    parser::{QName, XmlAttributes, XmlDocumentHandler, XmlDocumentScanner, XmlString},
};

/// Turns every event into a string.
#[derive(Clone, Default)]
pub struct Recorder(pub Rc<RefCell<Vec<String>>>);

impl Recorder {
    fn push(&self, event: String) {
        self.0.borrow_mut().push(event);
    }
}

impl XmlDocumentHandler for Recorder {
    fn start_document(&mut self, encoding: Option<&str>) {
        self.push(format!("startDocument({})", encoding.unwrap_or("")));
    }
    fn xml_decl(&mut self, version: Option<&str>, encoding: Option<&str>, standalone: Option<&str>) {
        self.push(format!(
            "xmlDecl({},{},{})",
            version.unwrap_or(""),
            encoding.unwrap_or(""),
            standalone.unwrap_or("")
        ));
    }
    fn text_decl(&mut self, version: Option<&str>, encoding: Option<&str>) {
        self.push(format!(
            "textDecl({},{})",
            version.unwrap_or(""),
            encoding.unwrap_or("")
        ));
    }
    fn doctype_decl(&mut self, root: &str, public_id: Option<&str>, system_id: Option<&str>) {
        self.push(format!(
            "doctype({root},{},{})",
            public_id.unwrap_or(""),
            system_id.unwrap_or("")
        ));
    }
    fn start_general_entity(
        &mut self,
        name: &str,
        _: Option<&XmlResourceIdentifier>,
        _: Option<&str>,
    ) {
        self.push(format!("startEntity({name})"));
    }
    fn end_general_entity(&mut self, name: &str) {
        self.push(format!("endEntity({name})"));
    }
    fn comment(&mut self, text: XmlString<'_>) {
        self.push(format!("comment({text})"));
    }
    fn processing_instruction(&mut self, target: &str, data: XmlString<'_>) {
        self.push(format!("pi({target},{data})"));
    }
    fn start_element(&mut self, element: &QName, attributes: &XmlAttributes) {
        let attrs = attributes
            .iter()
            .map(|attr| format!(" {}={}", attr.name.rawname(), attr.value))
            .collect::<String>();
        self.push(format!("start({}{attrs})", element.rawname()));
    }
    fn empty_element(&mut self, element: &QName, attributes: &XmlAttributes) {
        let attrs = attributes
            .iter()
            .map(|attr| format!(" {}={}", attr.name.rawname(), attr.value))
            .collect::<String>();
        self.push(format!("empty({}{attrs})", element.rawname()));
    }
    fn end_element(&mut self, element: &QName) {
        self.push(format!("end({})", element.rawname()));
    }
    fn characters(&mut self, text: XmlString<'_>) {
        // merged, so that the events do not depend on buffer boundaries
        let mut events = self.0.borrow_mut();
        if let Some(last) = events.last_mut().filter(|e| e.starts_with("chars(")) {
            last.pop();
            last.push_str(&text.to_string());
            last.push(')');
        } else {
            events.push(format!("chars({text})"));
        }
    }
    fn start_cdata(&mut self) {
        self.push("startCDATA".to_owned());
    }
    fn end_cdata(&mut self) {
        self.push("endCDATA".to_owned());
    }
    fn end_document(&mut self) {
        self.push("endDocument".to_owned());
    }
}

/// Keeps the keys of the diagnostics, prefixed with their level.
#[derive(Clone, Default)]
pub struct Diagnostics(pub Rc<RefCell<Vec<String>>>);

impl XmlErrorHandler for Diagnostics {
    fn warning(&mut self, error: &XmlError) {
        self.0.borrow_mut().push(format!("W:{}", error.key()));
    }
    fn error(&mut self, error: &XmlError) {
        self.0.borrow_mut().push(format!("E:{}", error.key()));
    }
    fn fatal_error(&mut self, error: &XmlError) {
        self.0.borrow_mut().push(format!("F:{}", error.key()));
    }
}

/// Serves external entities from memory, by literal system id. Other
/// entities are opened by the scanner.
#[derive(Clone, Default)]
pub struct Files(pub HashMap<String, Vec<u8>>);

impl Files {
    pub fn with(mut self, system_id: &str, content: impl Into<Vec<u8>>) -> Self {
        self.0.insert(system_id.to_owned(), content.into());
        self
    }
}

impl XmlEntityResolver for Files {
    fn resolve_entity(
        &mut self,
        identifier: &XmlResourceIdentifier,
    ) -> io::Result<Option<XmlInputSource>> {
        let Some(literal) = identifier.literal_system_id.as_deref() else {
            return Ok(None);
        };
        Ok(self.0.get(literal).map(|content| {
            XmlInputSource::from_bytes(identifier.expanded_system_id.as_deref(), content.clone())
        }))
    }
}

pub struct Outcome {
    pub events: Vec<String>,
    pub errors: Vec<String>,
    pub result: Result<bool, XmlScanError>,
    pub well_formed: bool,
}

pub fn recovering() -> XmlScanConfig {
    XmlScanConfig {
        continue_after_fatal_error: true,
        ..Default::default()
    }
}

/// Open `source` with version detection and scan it completely.
pub fn scan_source(
    source: XmlInputSource,
    config: XmlScanConfig,
    files: Files,
    fragment: bool,
) -> Outcome {
    let mut scanner = if fragment {
        XmlDocumentScanner::new_fragment(config)
    } else {
        XmlDocumentScanner::new(config)
    };
    let events = Recorder::default();
    let errors = Diagnostics::default();
    scanner.set_document_handler(Some(Box::new(events.clone())));
    scanner.set_error_handler(Some(Box::new(errors.clone())));
    scanner.set_entity_resolver(Some(Box::new(files)));
    let result = scanner
        .open(source)
        .and_then(|opened| if opened { scanner.scan_document(true) } else { Ok(false) });
    scanner.close();
    let well_formed = scanner.entity_manager().error_reporter().well_formed();
    let events = events.0.borrow().clone();
    let errors = errors.0.borrow().clone();
    Outcome {
        events,
        errors,
        result,
        well_formed,
    }
}

pub fn scan_bytes(bytes: impl Into<Vec<u8>>, config: XmlScanConfig, files: Files) -> Outcome {
    scan_source(
        XmlInputSource::from_bytes(Some("doc.xml"), bytes),
        config,
        files,
        false,
    )
}

pub fn scan_text(text: &str, config: XmlScanConfig) -> Outcome {
    scan_bytes(text.as_bytes().to_vec(), config, Files::default())
}
