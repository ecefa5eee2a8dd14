#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Detail visible only in verbose mode, such as inserted padding.
    Verbose,
    /// Something was dropped or adjusted, suppressed in quiet mode.
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Collects non-fatal messages produced during a conversion and forwards them
/// to the `log` facade.
#[derive(Debug, Default)]
pub struct Diagnostics {
    quiet: bool,
    verbose: bool,
    messages: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose,
            messages: Vec::new(),
        }
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        if self.quiet {
            return;
        }
        let message = message.into();
        log::warn!("{}", message);
        self.messages.push(Diagnostic {
            severity: Severity::Warning,
            message,
        });
    }

    pub fn verbose(&mut self, message: impl Into<String>) {
        if !self.verbose {
            return;
        }
        let message = message.into();
        log::info!("{}", message);
        self.messages.push(Diagnostic {
            severity: Severity::Verbose,
            message,
        });
    }

    pub fn messages(&self) -> &[Diagnostic] {
        &self.messages
    }

    /// Returns the messages of warning severity, oldest first.
    pub fn warnings(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|diagnostic| diagnostic.severity == Severity::Warning)
            .map(|diagnostic| diagnostic.message.as_str())
            .collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
