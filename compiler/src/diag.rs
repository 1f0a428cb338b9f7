// diag.rs — Generator diagnostics
//
// Shared diagnostic type for the schema loader, the insertion splicer and the
// emission engine. Every diagnostic is warn-and-continue; fatal conditions
// are error values, not diagnostics. Locations are best effort and fall back
// to the schema path.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: `report` writes to the tracing subscriber.

use std::fmt;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `W0001`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    /// Insertion key names a type that the schema does not define.
    pub const W0001: DiagCode = DiagCode("W0001");
    /// Interface property shares its name with a method.
    pub const W0002: DiagCode = DiagCode("W0002");
    /// Two members of one type share a name.
    pub const W0003: DiagCode = DiagCode("W0003");
    /// Enumeration without enumerators.
    pub const W0004: DiagCode = DiagCode("W0004");
}

// ── Location ─────────────────────────────────────────────────────────────

/// `file[:line[:column]]` position of a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Location {
    pub fn file(file: impl Into<String>) -> Self {
        Location {
            file: file.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(file: impl Into<String>, line: u32, column: u32) -> Self {
        Location {
            file: file.into(),
            line: (line > 0).then_some(line),
            column: (column > 0).then_some(column),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => write!(f, "{}:{}:{}", self.file, line, col),
            (Some(line), None) => write!(f, "{}:{}", self.file, line),
            _ => write!(f, "{}", self.file),
        }
    }
}

// ── Diagnostic ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub location: Option<Location>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            code: None,
            location: None,
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Render as `LOCATION: WARNING: message`, using `fallback` (the schema
    /// path) when the diagnostic has no location of its own.
    pub fn render(&self, fallback: &str) -> String {
        let loc = match &self.location {
            Some(loc) => loc.to_string(),
            None => fallback.to_string(),
        };
        format!("{}: {}", loc, self)
    }

    /// Emit through the tracing subscriber.
    pub fn report(&self, fallback: &str) {
        tracing::warn!("{}", self.render(fallback));
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "WARNING[{}]: {}", code, self.message)?;
        } else {
            write!(f, "WARNING: {}", self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}
