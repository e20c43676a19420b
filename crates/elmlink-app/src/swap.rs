//! The hot-swap seam
//!
//! Swapping a running program's code and state in place is performed by an
//! external collaborator; the session only asks for an attempt and receives
//! either success or the list of reasons the swap was incompatible. Those
//! reasons become a full-reload request, never a crash: implementations
//! must catch their own exceptions per program instance and report them as
//! [`ReloadReason::PatchFailed`].

use elmlink_core::types::CompilationMode;

/// Why hot-swapping new code into the running program was not possible
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadReason {
    /// The new code was compiled in a different mode than the running code
    ModeChanged {
        from: CompilationMode,
        to: CompilationMode,
    },
    /// Record field names were mangled differently (optimize mode)
    RecordFieldsChanged,
    /// `Browser.sandbox` became `Browser.application`, etc.
    ProgramTypeChanged,
    /// The new program subscribes to something the old one never set up
    NewSubscriptionAdded,
    /// The shape of the init flags changed
    FlagsShapeChanged,
    /// The patch itself threw; caught per program instance
    PatchFailed { message: String },
    /// The message type changed while running the debugger
    MessageTypeChangedInDebug,
}

impl std::fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadReason::ModeChanged { from, to } => {
                write!(f, "compilation mode changed from {from} to {to}")
            }
            ReloadReason::RecordFieldsChanged => {
                write!(f, "record fields changed between compiles")
            }
            ReloadReason::ProgramTypeChanged => write!(f, "the program type changed"),
            ReloadReason::NewSubscriptionAdded => {
                write!(f, "a new subscription was added")
            }
            ReloadReason::FlagsShapeChanged => write!(f, "the init flags changed shape"),
            ReloadReason::PatchFailed { message } => {
                write!(f, "hot-swapping failed: {message}")
            }
            ReloadReason::MessageTypeChangedInDebug => {
                write!(f, "the message type changed while the debugger is active")
            }
        }
    }
}

/// Result of one hot-swap attempt
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    /// New code and state are live; no reload needed
    Swapped,
    /// The swap is incompatible; a full reload is required
    NeedsReload(Vec<ReloadReason>),
    /// The code failed to parse under the strategy it was evaluated with
    SyntaxError(String),
}

/// Which evaluation path to try first when loading compiled code.
///
/// Compiled output may be an ES module or a classic script; one of the two
/// paths fails with a syntax error for any given artifact. Rather than
/// sniffing the code, the session keeps a current strategy and flips it
/// when the active one reports a syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalStrategy {
    ModuleFirst,
    ScriptFirst,
}

impl EvalStrategy {
    pub fn flipped(self) -> Self {
        match self {
            EvalStrategy::ModuleFirst => EvalStrategy::ScriptFirst,
            EvalStrategy::ScriptFirst => EvalStrategy::ModuleFirst,
        }
    }
}

impl Default for EvalStrategy {
    fn default() -> Self {
        EvalStrategy::ModuleFirst
    }
}

/// Attempt in-place replacement of a running program's code.
///
/// Implementations must never panic across this seam; anything thrown
/// during the patch is caught and reported as
/// [`ReloadReason::PatchFailed`].
pub trait HotSwap: Send {
    fn attempt(
        &mut self,
        code: &str,
        mode: CompilationMode,
        strategy: EvalStrategy,
    ) -> EvalOutcome;
}

/// A program export that may not exist yet.
///
/// Before the first real compile the page runs placeholder (proxy) code
/// with no usable exports. That absence is an explicit variant callers
/// check before every access, not a stub object that absorbs arbitrary
/// calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramHandle<T> {
    NotReady,
    Ready(T),
}

impl<T> ProgramHandle<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProgramHandle::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ProgramHandle::Ready(value) => Some(value),
            ProgramHandle::NotReady => None,
        }
    }
}

impl<T> Default for ProgramHandle<T> {
    fn default() -> Self {
        ProgramHandle::NotReady
    }
}
