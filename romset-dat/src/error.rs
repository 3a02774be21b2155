/// Errors that can occur while reading catalog and header-rule files.
#[derive(Debug, thiserror::Error)]
pub enum DatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid DAT file: {0}")]
    InvalidDat(String),

    #[error("Invalid header rule: {0}")]
    InvalidRule(String),
}

impl DatError {
    pub fn invalid_dat(msg: impl Into<String>) -> Self {
        Self::InvalidDat(msg.into())
    }

    pub fn invalid_rule(msg: impl Into<String>) -> Self {
        Self::InvalidRule(msg.into())
    }
}
