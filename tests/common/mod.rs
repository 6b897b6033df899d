//! Fact-dump builder standing in for a C++ front-end in tests.
//!
//! Positions are located by searching the source text, so a dump always
//! matches the text it was built from.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub struct FactDump {
    src: String,
    main_path: String,
    cursor: usize,
    files: Vec<String>,
    classes: Vec<Value>,
    declarations: Vec<Value>,
    content_hash: Option<String>,
}

impl FactDump {
    pub fn new(main_path: &str, src: &str) -> Self {
        Self {
            src: src.to_string(),
            main_path: main_path.to_string(),
            cursor: 0,
            files: vec![main_path.to_string()],
            classes: Vec::new(),
            declarations: Vec::new(),
            content_hash: None,
        }
    }

    fn find(&self, needle: &str) -> usize {
        match self.src[self.cursor..].find(needle) {
            Some(offset) => self.cursor + offset,
            None => panic!("{needle:?} not found after offset {}", self.cursor),
        }
    }

    fn pos(offset: usize) -> Value {
        json!({"file": 0, "offset": offset})
    }

    /// Search subsequent needles after the first occurrence of `needle`.
    pub fn within(mut self, needle: &str) -> Self {
        self.cursor = 0;
        self.cursor = self.find(needle);
        self
    }

    pub fn class(mut self, id: u64, name: &str, bases: &[u64]) -> Self {
        self.classes.push(json!({
            "id": id,
            "name": name,
            "has_definition": true,
            "bases": bases,
        }));
        self
    }

    pub fn forward_class(mut self, id: u64, name: &str) -> Self {
        self.classes.push(json!({
            "id": id,
            "name": name,
            "has_definition": false,
            "bases": [],
        }));
        self
    }

    /// User-declared destructor; `needle` must contain the `~` token.
    ///
    /// Virtual when spelled so, or when `inherited_virtual` (a virtual base
    /// destructor) is set.
    pub fn dtor(mut self, class: u64, needle: &str, inherited_virtual: bool) -> Self {
        let tilde = self.find(needle) + needle.find('~').unwrap_or(0);
        let is_virtual = inherited_virtual || self.src[..tilde].ends_with("virtual ");
        self.declarations.push(json!({
            "kind": "destructor",
            "class": class,
            "begin": Self::pos(tilde),
            "location": Self::pos(tilde),
            "is_virtual": is_virtual,
            "is_implicit": false,
        }));
        self
    }

    pub fn implicit_dtor(mut self, class: u64, class_needle: &str) -> Self {
        let at = self.find(class_needle);
        self.declarations.push(json!({
            "kind": "destructor",
            "class": class,
            "begin": Self::pos(at),
            "location": Self::pos(at),
            "is_virtual": false,
            "is_implicit": true,
        }));
        self
    }

    /// Method declared as `needle`, e.g. `void f(int a)`. The marker is
    /// detected from the text after the parameter list.
    pub fn method(mut self, id: u64, class: u64, needle: &str, overrides: &[u64]) -> Self {
        let start = self.find(needle);
        let paren = needle.find('(').unwrap_or(needle.len());
        let name_start = needle[..paren].rfind(' ').map_or(0, |i| i + 1);
        let name = &needle[name_start..paren];
        let rparen = start + self.src[start..].find(')').unwrap_or(0);
        let has_override_attr = self.src[rparen + 1..].starts_with(" override");
        self.declarations.push(json!({
            "kind": "method",
            "id": id,
            "class": class,
            "name": name,
            "location": Self::pos(start + name_start),
            "rparen": Self::pos(rparen),
            "overrides": overrides,
            "has_override_attr": has_override_attr,
        }));
        self
    }

    /// Range-for variable declared as `decl`, e.g. `const auto x`, whose
    /// type specification ends with the token `last_type_token`.
    pub fn loop_var(mut self, decl: &str, last_type_token: &str, category: &str) -> Self {
        let start = self.find(decl);
        let type_end = start + decl.rfind(last_type_token).unwrap_or(0);
        let name_start = decl
            .rfind(|c: char| c == ' ' || c == '&')
            .map_or(0, |i| i + 1);
        let spelling = decl[..name_start].trim_end().to_string();
        self.declarations.push(json!({
            "kind": "loop_variable",
            "name": &decl[name_start..],
            "location": Self::pos(start + name_start),
            "type": {
                "spelling": spelling,
                "is_const": decl.starts_with("const") && category != "reference",
                "category": category,
            },
            "type_end": Self::pos(type_end),
        }));
        self
    }

    /// Like [`FactDump::loop_var`], but a variable whose `&` was already
    /// inserted after `last_type_token` is reported as a reference.
    pub fn range_loop(self, decl: &str, last_type_token: &str, category: &str) -> Self {
        if self.src[self.cursor..].contains(decl) {
            return self.loop_var(decl, last_type_token, category);
        }
        let at = decl.rfind(last_type_token).unwrap_or(0) + last_type_token.len();
        let reference = format!("{}&{}", &decl[..at], &decl[at..]);
        self.loop_var(&reference, last_type_token, "reference")
    }

    /// A declaration in an included header, at `offset` of that header.
    pub fn header_dtor(mut self, header: &str, class: u64, offset: usize) -> Self {
        if !self.files.iter().any(|f| f == header) {
            self.files.push(header.to_string());
        }
        let file = self.files.iter().position(|f| f == header).unwrap_or(0);
        self.declarations.push(json!({
            "kind": "destructor",
            "class": class,
            "begin": {"file": file, "offset": offset},
            "location": {"file": file, "offset": offset},
            "is_virtual": false,
            "is_implicit": false,
        }));
        self
    }

    pub fn with_content_hash(mut self, hash: &str) -> Self {
        self.content_hash = Some(hash.to_string());
        self
    }

    /// Repeat every declaration, as traversing template instantiations does.
    pub fn visited_twice(mut self) -> Self {
        let again = self.declarations.clone();
        self.declarations.extend(again);
        self
    }

    pub fn to_json(&self) -> String {
        json!({
            "schema": 1,
            "files": self.files,
            "main_file": 0,
            "content_hash": self.content_hash,
            "classes": self.classes,
            "declarations": self.declarations,
        })
        .to_string()
    }

    pub fn main_path(&self) -> &str {
        &self.main_path
    }
}

/// Write `src` into `dir` with its sidecar dump and return the source path.
pub fn write_case(dir: &Path, name: &str, src: &str, dump: &FactDump) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, src).unwrap();
    write_sidecar(&path, dump);
    path
}

pub fn write_sidecar(path: &Path, dump: &FactDump) {
    let mut sidecar = path.as_os_str().to_os_string();
    sidecar.push(".facts.json");
    fs::write(PathBuf::from(sidecar), dump.to_json()).unwrap();
}
