use stagehand_core_types::RequestId;

/// Result type alias using StagedError
pub type Result<T> = std::result::Result<T, StagedError>;

/// Outcome of an operation that produces no value
pub type Status = Result<()>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// The first four kinds belong to the staged-update protocol itself. The
/// remaining kinds are produced by external collaborators (stores, codecs)
/// and pass through `commit()` verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // Protocol
    /// Malformed builder input, detected locally and recorded
    InvalidArgument,
    /// Aggregate of one or more recorded errors
    ValidationFailed,
    /// Known conflict; safe to retry after re-deriving against refreshed state
    CommitFailed,
    /// The write was submitted but its outcome could not be determined
    CommitStateUnknown,

    // Collaborator
    NotFound,
    AlreadyExists,
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "ERR_INVALID_ARGUMENT",
            ErrorKind::ValidationFailed => "ERR_VALIDATION_FAILED",
            ErrorKind::CommitFailed => "ERR_COMMIT_FAILED",
            ErrorKind::CommitStateUnknown => "ERR_COMMIT_STATE_UNKNOWN",
            ErrorKind::NotFound => "ERR_NOT_FOUND",
            ErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ErrorKind::Io => "ERR_IO",
            ErrorKind::Serialization => "ERR_SERIALIZATION",
            ErrorKind::Persistence => "ERR_PERSISTENCE",
            ErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether a failure of this kind may be retried after refreshing the base state.
    ///
    /// Only `CommitFailed` qualifies. `CommitStateUnknown` is never retryable:
    /// the write may already have been applied.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::CommitFailed)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Canonical structured error type
///
/// Carries a kind with a stable code, the message, and optional context for
/// debugging. Values are immutable once built and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedError {
    kind: ErrorKind,
    op: Option<String>,
    object_id: Option<String>,
    request_id: Option<RequestId>,
    message: String,
}

impl StagedError {
    /// Create a new error with the specified kind
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            op: None,
            object_id: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Shorthand for `InvalidArgument` with a message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument).with_message(message)
    }

    /// Shorthand for `ValidationFailed` with a message
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailed).with_message(message)
    }

    /// Shorthand for `CommitFailed` with a message
    pub fn commit_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CommitFailed).with_message(message)
    }

    /// Shorthand for `CommitStateUnknown` with a message
    pub fn commit_state_unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CommitStateUnknown).with_message(message)
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the id of the external object the error concerns
    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for StagedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(object_id) = &self.object_id {
            write!(f, " (object_id: {})", object_id)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for StagedError {}

// ========== End Error Facility ==========
