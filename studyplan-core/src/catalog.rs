//! Curriculum catalog: subjects, canonical term encoding and the id index.
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use thiserror::Error;

use crate::constants::LOG_TARGET_CATALOG;
use crate::integrity::{self, IntegrityWarning};

/// Prerequisite lists are short; keep up to four ids inline.
pub type PrerequisiteSet = SmallVec<[SubjectId; 4]>;

/// Stable subject identifier. Surrounding whitespace is trimmed on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SubjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// Catalog exports use both string and numeric ids; both normalize to text.
impl<'de> Deserialize<'de> for SubjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = SubjectId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a subject id as a string or integer")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(SubjectId::new(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(SubjectId::new(value.to_string()))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                Ok(SubjectId::new(value.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Canonical term a subject is taught in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "TermCode")]
pub enum Term {
    /// Runs across the whole academic year.
    FullYear,
    /// First term (first "cuatrimestre").
    First,
    /// Second term.
    Second,
}

impl Term {
    /// Map the numeric `0/1/2` encoding.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::FullYear),
            1 => Some(Self::First),
            2 => Some(Self::Second),
            _ => None,
        }
    }

    /// Map the textual encoding (`"primero"`/`"segundo"`/`"anual"` and English labels).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Ok(code) = label.parse::<u8>() {
            return Self::from_code(code);
        }
        match label.to_ascii_lowercase().as_str() {
            "anual" | "annual" | "full-year" | "full_year" | "fullyear" => Some(Self::FullYear),
            "primero" | "first" => Some(Self::First),
            "segundo" | "second" => Some(Self::Second),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::FullYear => 0,
            Self::First => 1,
            Self::Second => 2,
        }
    }

    #[must_use]
    pub const fn duration(self) -> DurationClass {
        match self {
            Self::FullYear => DurationClass::Annual,
            Self::First | Self::Second => DurationClass::Quarterly,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullYear => write!(f, "full-year"),
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TermCode {
    Numeric(i64),
    Label(String),
}

impl TryFrom<TermCode> for Term {
    type Error = CatalogError;

    fn try_from(value: TermCode) -> Result<Self, Self::Error> {
        match value {
            TermCode::Numeric(code) => u8::try_from(code)
                .ok()
                .and_then(Self::from_code)
                .ok_or_else(|| CatalogError::UnknownTerm(code.to_string())),
            TermCode::Label(label) => {
                Self::from_label(&label).ok_or(CatalogError::UnknownTerm(label))
            }
        }
    }
}

/// Duration class derived from the term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationClass {
    #[serde(alias = "anual")]
    Annual,
    #[serde(alias = "cuatrimestral")]
    Quarterly,
}

/// Errors raised when a catalog cannot be built.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate subject id `{0}`")]
    DuplicateSubject(SubjectId),
    #[error("subject id must not be empty")]
    EmptyId,
    #[error("subject `{subject}` has invalid curriculum year `{value}`")]
    InvalidYear { subject: SubjectId, value: String },
    #[error("unknown term encoding `{0}`")]
    UnknownTerm(String),
    #[error("catalog JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One curriculum entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SubjectRecord")]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub year: u8,
    pub term: Term,
    /// Needed (approved or pending final) to enroll.
    pub course_prerequisites: PrerequisiteSet,
    /// Needed (approved) before this subject's final exam.
    pub exam_prerequisites: PrerequisiteSet,
}

impl Subject {
    #[must_use]
    pub fn new(id: impl Into<SubjectId>, year: u8, term: Term) -> Self {
        let id = id.into();
        Self {
            name: id.as_str().to_string(),
            id,
            year,
            term,
            course_prerequisites: PrerequisiteSet::new(),
            exam_prerequisites: PrerequisiteSet::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_course_prerequisites<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SubjectId>,
    {
        self.course_prerequisites = dedup(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_exam_prerequisites<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SubjectId>,
    {
        self.exam_prerequisites = dedup(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn duration(&self) -> DurationClass {
        self.term.duration()
    }

    /// Course prerequisites with self references skipped.
    pub fn course_requirements(&self) -> impl Iterator<Item = &SubjectId> {
        self.course_prerequisites
            .iter()
            .filter(move |id| **id != self.id)
    }

    /// Exam prerequisites with self references skipped.
    pub fn exam_requirements(&self) -> impl Iterator<Item = &SubjectId> {
        self.exam_prerequisites
            .iter()
            .filter(move |id| **id != self.id)
    }

}

fn dedup(ids: impl Iterator<Item = SubjectId>) -> PrerequisiteSet {
    let mut set = PrerequisiteSet::new();
    for id in ids {
        if !id.is_empty() && !set.contains(&id) {
            set.push(id);
        }
    }
    set
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum YearCode {
    Number(i64),
    Text(String),
}

/// Boundary shape accepted from catalog exports.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectRecord {
    id: SubjectId,
    #[serde(default, alias = "nombre")]
    name: Option<String>,
    #[serde(alias = "anio")]
    year: YearCode,
    #[serde(default, alias = "semester")]
    term: Option<TermCode>,
    #[serde(default)]
    duration: Option<DurationClass>,
    #[serde(
        default,
        alias = "prerequisites",
        alias = "correlativasCursado",
        alias = "correlativas_cursado"
    )]
    course_prerequisites: Vec<SubjectId>,
    #[serde(
        default,
        alias = "finalPrerequisites",
        alias = "correlativasFinal",
        alias = "correlativas_final"
    )]
    exam_prerequisites: Vec<SubjectId>,
}

impl TryFrom<SubjectRecord> for Subject {
    type Error = CatalogError;

    fn try_from(record: SubjectRecord) -> Result<Self, Self::Error> {
        if record.id.is_empty() {
            return Err(CatalogError::EmptyId);
        }
        let year = match &record.year {
            YearCode::Number(value) => u8::try_from(*value).ok(),
            YearCode::Text(text) => text.trim().parse::<u8>().ok(),
        }
        .filter(|year| *year > 0)
        .ok_or_else(|| CatalogError::InvalidYear {
            subject: record.id.clone(),
            value: match &record.year {
                YearCode::Number(value) => value.to_string(),
                YearCode::Text(text) => text.clone(),
            },
        })?;

        let term = match (record.duration, record.term) {
            (Some(DurationClass::Annual), _) => Term::FullYear,
            (_, Some(code)) => Term::try_from(code)?,
            (Some(DurationClass::Quarterly), None) => Term::First,
            (None, None) => Term::FullYear,
        };

        let name = record
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| record.id.as_str().to_string());

        Ok(Self::new(record.id, year, term)
            .with_name(name)
            .with_course_prerequisites(record.course_prerequisites)
            .with_exam_prerequisites(record.exam_prerequisites))
    }
}

/// Immutable, id-indexed set of subjects for one curriculum.
///
/// Integrity validation runs once on construction; the resulting warnings are
/// logged at that point and carried by every report derived from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Subject>", into = "Vec<Subject>")]
pub struct Catalog {
    subjects: Vec<Subject>,
    index: HashMap<SubjectId, usize>,
    course_dependents: HashMap<SubjectId, Vec<usize>>,
    exam_dependents: HashMap<SubjectId, Vec<usize>>,
    warnings: Vec<IntegrityWarning>,
    topological_order: Option<Vec<usize>>,
}

impl Catalog {
    /// Build the catalog and validate its prerequisite graph.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for structural problems (empty or duplicate ids,
    /// year zero). Dangling references and cycles are warnings, not errors.
    pub fn new(mut subjects: Vec<Subject>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(subjects.len());
        for (position, subject) in subjects.iter_mut().enumerate() {
            // Fields are public, so lists built by hand may still repeat ids.
            subject.course_prerequisites =
                dedup(std::mem::take(&mut subject.course_prerequisites).into_iter());
            subject.exam_prerequisites =
                dedup(std::mem::take(&mut subject.exam_prerequisites).into_iter());
            if subject.id.is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if subject.year == 0 {
                return Err(CatalogError::InvalidYear {
                    subject: subject.id.clone(),
                    value: "0".to_string(),
                });
            }
            if index.insert(subject.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateSubject(subject.id.clone()));
            }
        }

        let mut course_dependents: HashMap<SubjectId, Vec<usize>> = HashMap::new();
        let mut exam_dependents: HashMap<SubjectId, Vec<usize>> = HashMap::new();
        for (position, subject) in subjects.iter().enumerate() {
            for prerequisite in subject.course_requirements() {
                course_dependents
                    .entry(prerequisite.clone())
                    .or_default()
                    .push(position);
            }
            for prerequisite in subject.exam_requirements() {
                exam_dependents
                    .entry(prerequisite.clone())
                    .or_default()
                    .push(position);
            }
        }

        let validation = integrity::validate(&subjects, &index);
        for warning in &validation.warnings {
            log::warn!(target: LOG_TARGET_CATALOG, "{warning}");
        }

        Ok(Self {
            subjects,
            index,
            course_dependents,
            exam_dependents,
            warnings: validation.warnings,
            topological_order: validation.order,
        })
    }

    /// Parse a JSON array of subject records.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the catalog is structurally invalid.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let subjects: Vec<Subject> = serde_json::from_str(json)?;
        Self::new(subjects)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Subject> {
        self.subjects.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Subject> {
        self.index.get(id).map(|&position| &self.subjects[position])
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Integrity warnings found while building the catalog.
    #[must_use]
    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.topological_order.is_some()
    }

    /// Prerequisites-first ordering, or `None` when the graph has a cycle.
    #[must_use]
    pub fn topological_order(&self) -> Option<Vec<&SubjectId>> {
        self.topological_order.as_ref().map(|order| {
            order
                .iter()
                .map(|&position| &self.subjects[position].id)
                .collect()
        })
    }

    /// Subjects listing `id` as a course prerequisite.
    pub fn course_dependents(&self, id: &str) -> impl Iterator<Item = &Subject> {
        self.dependents_in(&self.course_dependents, id)
    }

    /// Subjects listing `id` as an exam prerequisite.
    pub fn exam_dependents(&self, id: &str) -> impl Iterator<Item = &Subject> {
        self.dependents_in(&self.exam_dependents, id)
    }

    fn dependents_in<'a>(
        &'a self,
        map: &'a HashMap<SubjectId, Vec<usize>>,
        id: &str,
    ) -> impl Iterator<Item = &'a Subject> {
        map.get(id)
            .into_iter()
            .flatten()
            .map(|&position| &self.subjects[position])
    }

    /// Number of course plus exam references pointing at `id`.
    #[must_use]
    pub fn dependents_count(&self, id: &str) -> usize {
        self.course_dependents.get(id).map_or(0, Vec::len)
            + self.exam_dependents.get(id).map_or(0, Vec::len)
    }

    /// Transitive course prerequisites of `id`, nearest first.
    ///
    /// Ids missing from the catalog are included once but not expanded.
    #[must_use]
    pub fn prerequisite_chain(&self, id: &str) -> Vec<SubjectId> {
        let Some(root) = self.get(id) else {
            return Vec::new();
        };
        let mut seen: BTreeSet<&SubjectId> = BTreeSet::from([&root.id]);
        let mut chain = Vec::new();
        let mut queue: VecDeque<&Subject> = VecDeque::from([root]);
        while let Some(subject) = queue.pop_front() {
            for prerequisite in subject.course_requirements() {
                if !seen.insert(prerequisite) {
                    continue;
                }
                chain.push(prerequisite.clone());
                if let Some(next) = self.get(prerequisite.as_str()) {
                    queue.push_back(next);
                }
            }
        }
        chain
    }

    /// Distinct curriculum years present in the catalog.
    #[must_use]
    pub fn years(&self) -> BTreeSet<u8> {
        self.subjects.iter().map(|subject| subject.year).collect()
    }
}

impl TryFrom<Vec<Subject>> for Catalog {
    type Error = CatalogError;

    fn try_from(subjects: Vec<Subject>) -> Result<Self, Self::Error> {
        Self::new(subjects)
    }
}

impl From<Catalog> for Vec<Subject> {
    fn from(catalog: Catalog) -> Self {
        catalog.subjects
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Subject;
    type IntoIter = std::slice::Iter<'a, Subject>;

    fn into_iter(self) -> Self::IntoIter {
        self.subjects.iter()
    }
}
