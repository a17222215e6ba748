//! Java language support.

use super::Language;
use tree_sitter::Language as TsLanguage;

/// Words that cannot name a Java class, method, field or local.
const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null", "var", "record", "yield",
];

/// Java, the only language the migration targets.
pub struct Java;

impl Java {
    /// Returns true for keywords and literals that cannot be used as names.
    pub fn is_reserved(word: &str) -> bool {
        RESERVED.contains(&word)
    }
}

impl Language for Java {
    fn name(&self) -> &'static str {
        "java"
    }

    fn extensions(&self) -> &[&'static str] {
        &["java"]
    }

    fn grammar(&self) -> TsLanguage {
        tree_sitter_java::LANGUAGE.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_words() {
        assert!(Java::is_reserved("new"));
        assert!(Java::is_reserved("null"));
        assert!(!Java::is_reserved("download"));
        assert!(!Java::is_reserved("New"));
    }
}
