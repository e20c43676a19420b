//! Core domain types shared by every elm-link crate

use serde::{Deserialize, Serialize};

/// How a target's running code was compiled.
///
/// `Proxy` is the placeholder mode a page starts in before any real compile
/// has produced code for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilationMode {
    Proxy,
    Debug,
    Standard,
    Optimize,
}

impl CompilationMode {
    /// Human-readable label used in log lines and reload reasons
    pub fn label(&self) -> &'static str {
        match self {
            CompilationMode::Proxy => "proxy",
            CompilationMode::Debug => "debug",
            CompilationMode::Standard => "standard",
            CompilationMode::Optimize => "optimize",
        }
    }
}

impl std::fmt::Display for CompilationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Corner of the page where the browser UI is docked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BrowserUiPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Default for BrowserUiPosition {
    fn default() -> Self {
        BrowserUiPosition::BottomLeft
    }
}

/// Source position of a compile error, used for "open in editor"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One compile error as reported by the build server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileErrorReport {
    pub title: String,
    #[serde(default)]
    pub location: Option<ErrorLocation>,
    pub html_content: String,
}

/// Terminal colors the server rendered its error output with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorColors {
    #[serde(default)]
    pub foreground: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
}

/// Why a session reached a settled state.
///
/// Delivered through the idle-reached hook every time the state machine
/// arrives at a status where no further work is in flight. The reload
/// coordinator runs on these, so a target that is merely waiting for other
/// targets gets re-checked whenever any of them settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    AlreadyUpToDate,
    EvalSucceeded,
    EvalErrored,
    CompileError,
    ElmJsonError,
    UnexpectedError,
    WaitingForReload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compilation_mode_serde_lowercase() {
        let json = serde_json::to_string(&CompilationMode::Optimize).unwrap();
        assert_eq!(json, "\"optimize\"");
        let mode: CompilationMode = serde_json::from_str("\"proxy\"").unwrap();
        assert_eq!(mode, CompilationMode::Proxy);
    }

    #[test]
    fn test_browser_ui_position_serde_camel_case() {
        let json = serde_json::to_string(&BrowserUiPosition::BottomRight).unwrap();
        assert_eq!(json, "\"bottomRight\"");
        let pos: BrowserUiPosition = serde_json::from_str("\"topLeft\"").unwrap();
        assert_eq!(pos, BrowserUiPosition::TopLeft);
    }

    #[test]
    fn test_error_location_display() {
        let loc = ErrorLocation {
            file: "src/Main.elm".to_string(),
            line: 12,
            column: 3,
        };
        assert_eq!(loc.to_string(), "src/Main.elm:12:3");
    }

    #[test]
    fn test_compile_error_report_optional_location() {
        let json = r#"{"title":"TYPE MISMATCH","htmlContent":"<p>boom</p>"}"#;
        let report: CompileErrorReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.title, "TYPE MISMATCH");
        assert!(report.location.is_none());
    }
}
