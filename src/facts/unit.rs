use crate::facts::schema::{ClassFact, TranslationUnitFacts};
use crate::facts::{
    ClassId, Declaration, FactProvider, FileId, MethodDecl, MethodId, QualType, TypeClass,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// A [`FactProvider`] over a validated fact dump.
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    facts: TranslationUnitFacts,
    class_index: HashMap<ClassId, usize>,
}

impl TranslationUnit {
    /// Index a dump. Callers are expected to have run
    /// [`TranslationUnitFacts::validate`] first; unknown ids are treated as
    /// absent rather than panicking.
    pub fn new(facts: TranslationUnitFacts) -> Self {
        let class_index = facts
            .classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.id, idx))
            .collect();
        Self { facts, class_index }
    }

    pub fn path(&self, file: FileId) -> Option<&Path> {
        self.facts.files.get(file.0 as usize).map(PathBuf::as_path)
    }

    /// Path of the main file as recorded by the front-end.
    pub fn main_path(&self) -> &Path {
        self.path(self.facts.main_file).unwrap_or(Path::new(""))
    }

    /// Whether `content` is the text the dump was computed from.
    ///
    /// Dumps without a recorded hash always match.
    pub fn matches_content(&self, content: &[u8]) -> bool {
        match &self.facts.content_hash {
            Some(expected) => u64::from_str_radix(expected.trim(), 16)
                .is_ok_and(|expected| expected == xxh3_64(content)),
            None => true,
        }
    }

    fn class(&self, id: ClassId) -> Option<&ClassFact> {
        self.class_index.get(&id).map(|&idx| &self.facts.classes[idx])
    }

    /// Whether `derived` has `base` among its direct or transitive bases.
    ///
    /// A class is not derived from itself. Cycles in malformed input are
    /// cut by the visited set.
    fn is_derived_from(&self, derived: &ClassFact, base: ClassId) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<ClassId> = derived.bases.clone();

        while let Some(current) = stack.pop() {
            if current == base {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(class) = self.class(current) {
                stack.extend(class.bases.iter().copied());
            }
        }

        false
    }
}

impl FactProvider for TranslationUnit {
    fn main_file(&self) -> FileId {
        self.facts.main_file
    }

    fn for_each_declaration(&self, visit: &mut dyn FnMut(&Declaration)) {
        for decl in &self.facts.declarations {
            visit(decl);
        }
    }

    fn definition_of(&self, class: ClassId) -> Option<ClassId> {
        self.class(class)
            .filter(|class| class.has_definition)
            .map(|class| class.id)
    }

    fn has_subclass(&self, definition: ClassId) -> bool {
        self.facts
            .classes
            .iter()
            .filter(|class| class.has_definition && class.id != definition)
            .any(|class| self.is_derived_from(class, definition))
    }

    fn overridden_by<'a>(&'a self, method: &'a MethodDecl) -> &'a [MethodId] {
        &method.overrides
    }

    fn classify(&self, ty: &QualType) -> TypeClass {
        ty.category
    }
}
