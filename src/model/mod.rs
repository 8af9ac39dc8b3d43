//! Domain model types (pure).
//!
//! All types in this module are pure data with smart constructors.

pub mod error;
pub mod identifiers;
pub mod malformed_entry;
pub mod message;
pub mod record;
pub mod session;
pub mod stats;
pub mod tool_result;
pub mod usage;

// Re-export for convenience
pub use error::{AppError, ExportError, ParseError, SessionLoadError, WatermarkError};
pub use identifiers::{
    EntryUuid, InvalidSessionId, InvalidToolUseId, InvalidUuid, SessionId, ToolUseId,
};
pub use malformed_entry::MalformedEntry;
pub use message::{
    ContentBlock, ImageAttachment, Message, Role, SystemEvent, ToolCall, ToolName,
};
pub use record::{RawRecord, RecordContext, RecordFlags, RecordPayload, RecordType};
pub use session::{Session, SessionMetadata};
pub use stats::{
    CommandRun, FilesTouched, ModelPricing, PricingConfig, SessionStats, ToolResultSummary,
};
pub use tool_result::{
    BashResult, ClassifiedResult, FileEditResult, FileReadResult, FileWriteResult, GlobResult,
    GrepResult, PlanResult, QuestionAnswer, ResultKind, SearchHit, TaskResult, TodoItem,
    TodoWriteResult, UnknownResult, UserInputResult, WebFetchResult, WebSearchResult,
};
pub use usage::{ModelInfo, TokenUsage, SYNTHETIC_MODEL};
