mod options;
mod progress;
mod service;
mod workflow;

// Public API of the practice subsystem.
pub use crate::error::{PracticeError, SessionError};
pub use options::{FULL_OPTION_COUNT, generate_options};
pub use progress::SessionProgress;
pub use service::{AnswerVerdict, ExitConfirmation, PracticeSession, SessionState};
pub use workflow::{PracticeAdvance, PracticeLoopService};
