//! Callback interfaces of the document scanner.

use crate::io::{XmlInputSource, XmlResourceIdentifier};

use super::{QName, XmlAttributes, XmlString};

/// Receiver of the structural events of a document.
///
/// Every method does nothing by default. Text is only valid during the
/// call that receives it.
#[allow(unused_variables)]
pub trait XmlDocumentHandler {
    /// The document entity started. `encoding` is the one the document is
    /// read with, if known.
    fn start_document(&mut self, encoding: Option<&str>) {}

    fn xml_decl(&mut self, version: Option<&str>, encoding: Option<&str>, standalone: Option<&str>) {
    }

    /// The text declaration of an external parsed entity.
    fn text_decl(&mut self, version: Option<&str>, encoding: Option<&str>) {}

    fn doctype_decl(&mut self, root: &str, public_id: Option<&str>, system_id: Option<&str>) {}

    /// A general entity started.
    ///
    /// Entities that are not expanded are started and ended without
    /// content. Character references and predefined entities are reported
    /// this way when their notification is on.
    fn start_general_entity(
        &mut self,
        name: &str,
        identifier: Option<&XmlResourceIdentifier>,
        encoding: Option<&str>,
    ) {
    }

    fn end_general_entity(&mut self, name: &str) {}

    fn comment(&mut self, text: XmlString<'_>) {}

    fn processing_instruction(&mut self, target: &str, data: XmlString<'_>) {}

    fn start_element(&mut self, element: &QName, attributes: &XmlAttributes) {}

    fn empty_element(&mut self, element: &QName, attributes: &XmlAttributes) {}

    fn end_element(&mut self, element: &QName) {}

    fn characters(&mut self, text: XmlString<'_>) {}

    fn start_cdata(&mut self) {}

    fn end_cdata(&mut self) {}

    fn end_document(&mut self) {}
}

/// Supplies an external subset for documents that do not name one.
pub trait XmlExternalSubsetResolver {
    /// Return the external subset of a document whose root element is
    /// `root_name`, or `None` if there is none.
    fn get_external_subset(
        &mut self,
        root_name: &str,
        base_system_id: Option<&str>,
    ) -> Option<XmlInputSource>;
}
