use crate::location::Location;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{loc}: {severity}: {message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub loc: Location,
    pub message: String,
}

// Marker returned by parser productions and passes. The reason was already recorded in `Errors`
// so the marker itself carries nothing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("one or more errors were reported")]
pub struct Failed;

// Diagnostics collected in the order they were reported. Passes append to a collection owned by
// the caller and decide their own success by comparing error counts before and after.
#[derive(Debug, Clone, Default)]
pub struct Errors {
    diagnostics: Vec<Diagnostic>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, loc: Location, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Error,
            loc,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, loc: Location, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Warning,
            loc,
            message: message.into(),
        });
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn append(&mut self, other: Errors) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    // Result of a pass which started when the collection had `errors_before` errors.
    pub fn pass_result(&self, errors_before: usize) -> Result<(), Failed> {
        if self.error_count() > errors_before {
            Err(Failed)
        } else {
            Ok(())
        }
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut errs = Errors::new();
        errs.warning(Location::default(), "empty module");
        assert!(!errs.has_errors());
        assert_eq!(errs.error_count(), 0);
        assert_eq!(errs.len(), 1);
        assert!(errs.pass_result(0).is_ok());

        errs.error(Location::new(None, 1, 2, 3), "oops");
        assert!(errs.has_errors());
        assert_eq!(errs.error_count(), 1);
        assert_eq!(errs.pass_result(0), Err(Failed));
        assert!(errs.pass_result(1).is_ok());
    }

    #[test]
    fn display_diagnostics() {
        let mut errs = Errors::new();
        errs.error(Location::new(Some("a.wat".into()), 1, 2, 3), "first");
        errs.warning(Location::new(Some("a.wat".into()), 4, 5, 6), "second");
        assert_eq!(errs.to_string(), "a.wat:1:2: error: first\na.wat:4:5: warning: second");
    }
}
