use crate::span::Span;

/// A front-end diagnostic raised while recovering a kernel body.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Render the diagnostic against the kernel source using ariadne.
    ///
    /// Output is plain text (no ANSI colors) so it can be embedded in logs
    /// and error messages.
    pub fn render(&self, name: &str, source: &str) -> String {
        use ariadne::{Config, Label, Report, ReportKind, Source};

        let len = source.len();
        let start = (self.span.start as usize).min(len);
        let end = (self.span.end as usize).clamp(start, len);

        let mut report = Report::build(ReportKind::Error, name, start)
            .with_config(Config::default().with_color(false))
            .with_message(&self.message)
            .with_label(Label::new((name, start..end)).with_message(&self.message));

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        let mut out = Vec::new();
        if report
            .finish()
            .write((name, Source::from(source)), &mut out)
            .is_err()
        {
            return format!("{}: {}", name, self.message);
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (at {}..{})",
            self.message, self.span.start, self.span.end
        )
    }
}

/// Render a list of diagnostics into one report.
pub fn render_diagnostics(diagnostics: &[Diagnostic], name: &str, source: &str) -> String {
    diagnostics
        .iter()
        .map(|d| d.render(name, source))
        .collect::<Vec<_>>()
        .join("\n")
}
