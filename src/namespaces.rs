//! Module namespaces and qualified names
//!
//! Every schema node belongs to a YANG module. A [`QName`] pairs the module
//! name with the node identifier; a [`Module`] records the module's
//! namespace URI and prefix.

use std::fmt;

/// Qualified name (QName) - combination of module and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Name of the module defining the node
    pub module: String,
    /// Local identifier
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(module: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            local_name: local_name.into(),
        }
    }

    /// Render as `module:name`, the JSON-style qualified form
    pub fn qualified(&self) -> String {
        format!("{}:{}", self.module, self.local_name)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.local_name)
    }
}

/// A YANG module the schema nodes belong to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Module name
    pub name: String,
    /// Namespace URI
    pub namespace: String,
    /// Module prefix
    pub prefix: String,
}

impl Module {
    /// Create a new module description
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            prefix: prefix.into(),
        }
    }

    /// Create a qualified name inside this module
    pub fn qname(&self, local_name: impl Into<String>) -> QName {
        QName::new(self.name.clone(), local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::new("ietf-interfaces", "interface");
        assert_eq!(qname.module, "ietf-interfaces");
        assert_eq!(qname.local_name, "interface");
    }

    #[test]
    fn test_qname_display() {
        let qname = QName::new("ietf-interfaces", "interface");
        assert_eq!(qname.to_string(), "ietf-interfaces:interface");
        assert_eq!(qname.qualified(), "ietf-interfaces:interface");
    }

    #[test]
    fn test_module_qname() {
        let module = Module::new("ex", "urn:example", "ex");
        assert_eq!(module.qname("top"), QName::new("ex", "top"));
    }
}
