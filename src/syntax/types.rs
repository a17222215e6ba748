//! Helpers for Java type text.

use serde::{Deserialize, Serialize};

/// A type as written in source, e.g. `AsyncTask<String, Integer, Long>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub text: String,
}

impl TypeRef {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
        }
    }

    /// Simple name without package qualifier or type arguments.
    pub fn simple_name(&self) -> &str {
        simple_type_name(&self.text)
    }

    /// Top-level type arguments, in order.
    pub fn args(&self) -> Vec<String> {
        type_args(&self.text)
    }

    /// Returns true when the type's simple name is `name`.
    pub fn is(&self, name: &str) -> bool {
        self.simple_name() == name
    }
}

/// Strips qualifiers, type arguments and array brackets from a type.
pub fn simple_type_name(text: &str) -> &str {
    let base = text.split('<').next().unwrap_or(text);
    let base = base.trim().trim_end_matches("[]").trim_end_matches("...");
    base.rsplit('.').next().unwrap_or(base).trim()
}

/// Splits the top-level type arguments of a generic type.
pub fn type_args(text: &str) -> Vec<String> {
    let Some(open) = text.find('<') else {
        return Vec::new();
    };
    let Some(close) = text.rfind('>') else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in text[open + 1..close].chars() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Returns true when `word` appears in `text` as a whole identifier.
pub fn mentions(text: &str, word: &str) -> bool {
    text.split(|c: char| !is_ident_char(c)).any(|token| token == word)
}

/// Returns true when `text` spells out the dotted name `qualified` in full.
pub fn mentions_qualified(text: &str, qualified: &str) -> bool {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact.match_indices(qualified).any(|(start, _)| {
        let before = compact[..start].chars().next_back();
        let after = compact[start + qualified.len()..].chars().next();
        !before.is_some_and(|c| is_ident_char(c) || c == '.') && !after.is_some_and(is_ident_char)
    })
}

/// Boxes primitive type names so they can be used as type arguments.
pub fn boxed(ty: &str) -> &str {
    match ty {
        "int" => "Integer",
        "long" => "Long",
        "short" => "Short",
        "byte" => "Byte",
        "char" => "Character",
        "boolean" => "Boolean",
        "float" => "Float",
        "double" => "Double",
        "void" => "Void",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name("android.os.AsyncTask<A, B, C>"), "AsyncTask");
        assert_eq!(simple_type_name("String[]"), "String");
        assert_eq!(simple_type_name("String..."), "String");
        assert_eq!(simple_type_name("Download"), "Download");
    }

    #[test]
    fn test_mentions_qualified_matches_whole_paths() {
        let fqn = "com.example.Loader.Download";
        assert!(mentions_qualified("com.example.Loader.Download", fqn));
        assert!(mentions_qualified("List<com.example.Loader .Download>", fqn));
        assert!(!mentions_qualified("com.example.Loader.DownloadAll", fqn));
        assert!(!mentions_qualified("org.com.example.Loader.Download", fqn));
        assert!(!mentions_qualified("Loader.Download", fqn));
    }

    #[test]
    fn test_type_args_respect_nesting() {
        let ty = TypeRef::new("AsyncTask<List<String>, Map<String, Integer>, Void>");
        assert_eq!(
            ty.args(),
            vec!["List<String>", "Map<String, Integer>", "Void"]
        );
        assert!(TypeRef::new("AsyncTask").args().is_empty());
    }

    #[test]
    fn test_mentions_whole_words_only() {
        assert!(mentions("new Download().execute()", "Download"));
        assert!(!mentions("DownloadTask t;", "Download"));
        assert!(mentions("List<Download> items", "Download"));
    }

    #[test]
    fn test_boxed() {
        assert_eq!(boxed("int"), "Integer");
        assert_eq!(boxed("String"), "String");
    }
}
