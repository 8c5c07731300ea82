//! The pull scanner.
//!
//! A document is scanned by an [`XmlDocumentScanner`]. Each call to
//! [`XmlDocumentScanner::dispatch`] scans a piece of the document and
//! reports what it found to an [`XmlDocumentHandler`]. Entities are opened
//! and read by the [`XmlEntityManager`] the scanner owns; declarations of
//! the DTD are read by an [`XmlDtdScanner`], which registers the entities
//! they declare.
//!
//! # Examples
//!
//! ```
//! use xscan::{
//!     config::XmlScanConfig,
//!     io::XmlInputSource,
//!     parser::{QName, XmlAttributes, XmlDocumentHandler, XmlDocumentScanner},
//! };
//!
//! #[derive(Default)]
//! struct Count(usize);
//!
//! impl XmlDocumentHandler for Count {
//!     fn start_element(&mut self, _: &QName, _: &XmlAttributes) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let mut scanner = XmlDocumentScanner::new(XmlScanConfig::default());
//! scanner.set_document_handler(Some(Box::new(Count::default())));
//! scanner
//!     .set_input_source(XmlInputSource::from_string(Some("doc.xml"), "<a><b/></a>"))
//!     .unwrap();
//! assert!(!scanner.scan_document(true).unwrap());
//! assert!(scanner.entity_manager().error_reporter().well_formed());
//! ```

/// Call `$method` on the document handler of `$scanner`, if it has one.
macro_rules! notify {
    ($scanner:expr, $method:ident($($arg:expr),* $(,)?)) => {
        if let Some(handler) = $scanner.handler.as_deref_mut() {
            handler.$method($($arg),*);
        }
    };
}

mod attributes;
mod document;
mod dtd;
mod entity;
mod entity_manager;
mod entity_scanner;
mod fragment;
mod handler;
mod pools;
mod qname;
pub mod scanner;
mod version;
mod xmlstring;

pub use attributes::*;
pub use document::*;
pub use dtd::*;
pub use entity::*;
pub use entity_manager::*;
pub use entity_scanner::*;
pub use handler::*;
pub use qname::*;
pub use version::*;
pub use xmlstring::*;
