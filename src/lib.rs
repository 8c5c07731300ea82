//! A streaming, pull-based XML scanner.
//!
//! Documents are scanned in steps by an [`XmlDocumentScanner`] that
//! reports what it finds to an [`XmlDocumentHandler`]. Entities are opened,
//! decoded and stacked by an [`XmlEntityManager`], and read with the XML 1.0
//! or XML 1.1 rules depending on the version the document declares.
//!
//! [`XmlDocumentScanner`]: parser::XmlDocumentScanner
//! [`XmlDocumentHandler`]: parser::XmlDocumentHandler
//! [`XmlEntityManager`]: parser::XmlEntityManager
#![allow(clippy::needless_range_loop)]
#![warn(unused_mut)]
#![warn(unused_imports)]
#![warn(unused_variables)]

pub mod chvalid;
pub mod config;
pub mod dict;
pub mod encoding;
pub mod error;
pub mod globals;
pub mod io;
pub mod parser;
pub mod uri;
