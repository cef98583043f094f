use std::collections::BTreeMap;

/// Events collected from the parser, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlParsingEvent {
    StartDocument,
    EndDocument,
    /// Attributes without a value are recorded with an empty string.
    StartElement {
        name: String,
        attributes: BTreeMap<String, String>,
    },
    EndElement {
        name: String,
    },
    /// A maximal run of text between two other events.
    Characters(String),
    Comment(String),
    Cdata(Vec<u8>),
    ProcessingInstruction {
        target: String,
        data: String,
    },
}
