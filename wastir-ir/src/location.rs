use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

// Location of a token or a syntax node in source text. Lines and columns are 1-based and columns
// count bytes. A default location (line 0) is used for nodes synthesized by passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: Option<Arc<str>>,
    pub line: u32,
    pub first_column: u32,
    pub last_column: u32,
}

impl Location {
    pub fn new(file: Option<Arc<str>>, line: u32, first_column: u32, last_column: u32) -> Self {
        Location {
            file,
            line,
            first_column,
            last_column,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        self.line == 0
    }

    // Position ordering ignoring file name. Used to decide which of two bindings came later.
    pub fn cmp_position(&self, other: &Location) -> Ordering {
        (self.line, self.first_column).cmp(&(other.line, other.first_column))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file)?;
        }
        write!(f, "{}:{}", self.line, self.first_column)
    }
}
