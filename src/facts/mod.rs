//! Semantic facts about a C++ translation unit.
//!
//! The rule engine never parses C++. Everything it knows comes through the
//! [`FactProvider`] trait: a declaration traversal plus a handful of semantic
//! queries (subclass existence, override sets, type classification) that a
//! C++ front-end has already resolved.
//!
//! [`TranslationUnit`] is the bundled provider, backed by a JSON fact dump
//! (see [`schema::TranslationUnitFacts`]).

pub mod loader;
pub mod schema;
pub mod unit;

pub use loader::{load_from_path, load_from_str, FactsError};
pub use schema::{ClassFact, TranslationUnitFacts, ValidationError, ValidationIssue};
pub use unit::TranslationUnit;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into the translation unit's file table.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FileId(pub u32);

/// Identity of a class entity (all redeclarations share one id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u64);

/// Identity of a method, used only to express override sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(pub u64);

/// A byte offset within a specific file.
///
/// Ordering is by file, then offset; positions are stable dedup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub file: FileId,
    pub offset: u32,
}

impl SourcePosition {
    pub fn new(file: FileId, offset: u32) -> Self {
        Self { file, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset as usize
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.file.0, self.offset)
    }
}

/// Coarse type classification answered by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeClass {
    /// Built-in arithmetic, `bool` or character type.
    Fundamental,
    /// Lvalue or rvalue reference.
    Reference,
    /// Class, struct, array, pointer, enum, ...
    Other,
}

/// A declared type as resolved by the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualType {
    /// Source spelling, for logs only.
    #[serde(default)]
    pub spelling: String,
    /// Top-level `const` qualification. A reference type is never
    /// const-qualified itself, even when it refers to a const object.
    #[serde(default)]
    pub is_const: bool,
    pub category: TypeClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestructorDecl {
    pub class: ClassId,
    /// Start of the whole declaration (including leading specifiers).
    #[serde(default)]
    pub begin: Option<SourcePosition>,
    /// Position of the declared name, i.e. the `~` token.
    #[serde(default)]
    pub location: Option<SourcePosition>,
    /// Virtual as written or inherited from a virtual base destructor.
    #[serde(default)]
    pub is_virtual: bool,
    /// Compiler-declared, no spelling in source.
    #[serde(default)]
    pub is_implicit: bool,
    #[serde(default)]
    pub out_of_line: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub id: MethodId,
    pub class: ClassId,
    #[serde(default)]
    pub name: String,
    /// Position of the method name.
    #[serde(default)]
    pub location: Option<SourcePosition>,
    /// Position of the `)` closing the parameter list.
    #[serde(default)]
    pub rparen: Option<SourcePosition>,
    /// Base virtual methods this one overrides.
    #[serde(default)]
    pub overrides: Vec<MethodId>,
    /// An `override` marker is already spelled in source.
    #[serde(default)]
    pub has_override_attr: bool,
    #[serde(default)]
    pub out_of_line: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopVariableDecl {
    #[serde(default)]
    pub name: String,
    /// Position of the variable name.
    #[serde(default)]
    pub location: Option<SourcePosition>,
    #[serde(default, rename = "type")]
    pub ty: Option<QualType>,
    /// Start of the last token of the type specification.
    #[serde(default)]
    pub type_end: Option<SourcePosition>,
}

/// A declaration visited during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Destructor(DestructorDecl),
    Method(MethodDecl),
    LoopVariable(LoopVariableDecl),
}

impl Declaration {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Declaration::Destructor(_) => "destructor",
            Declaration::Method(_) => "method",
            Declaration::LoopVariable(_) => "loop_variable",
        }
    }
}

/// Capability interface over a semantically resolved translation unit.
///
/// Any C++ front-end able to answer these queries can drive the rules.
pub trait FactProvider {
    /// The file the tool was invoked on.
    fn main_file(&self) -> FileId;

    fn is_in_main_file(&self, position: SourcePosition) -> bool {
        position.file == self.main_file()
    }

    /// Visit every declaration of interest, in traversal order.
    fn for_each_declaration(&self, visit: &mut dyn FnMut(&Declaration));

    /// The class itself if it has a completed definition, `None` for a
    /// class that is only forward declared.
    fn definition_of(&self, class: ClassId) -> Option<ClassId>;

    /// Whether any class definition in the unit derives, directly or
    /// transitively, from `definition`.
    fn has_subclass(&self, definition: ClassId) -> bool;

    /// The override set of `method`.
    fn overridden_by<'a>(&'a self, method: &'a MethodDecl) -> &'a [MethodId];

    fn classify(&self, ty: &QualType) -> TypeClass;
}
